//! Controller error taxonomy.
//!
//! DESIGN
//! ======
//! Every failure is terminal at the controller boundary: nothing here is
//! retried automatically. `retryable()` only tells the view layer whether
//! offering a manual retry makes sense.

/// Errors produced by resource controller operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// Required fields are missing or a value could not be interpreted.
    /// Raised before any network call is made.
    #[error("{}", validation_message(missing, invalid))]
    Validation { missing: Vec<String>, invalid: Vec<String> },

    /// The caller passed an argument the operation cannot act on
    /// (absent id, unknown field or attachment role).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A submit or delete is already outstanding on this controller.
    #[error("another request is still in progress")]
    Busy,

    /// The request could not complete (connectivity, unreachable server).
    #[error("network error: {0}")]
    Network(String),

    /// The request completed but the server reported failure.
    /// `message` is the server's own text when it supplied one.
    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    /// The response body could not be interpreted.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ControllerError {
    /// Build a validation error from the offending field names.
    #[must_use]
    pub fn validation(missing: Vec<String>, invalid: Vec<String>) -> Self {
        Self::Validation { missing, invalid }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "E_VALIDATION",
            Self::InvalidArgument(_) => "E_INVALID_ARGUMENT",
            Self::Busy => "E_BUSY",
            Self::Network(_) => "E_NETWORK",
            Self::Server { .. } => "E_SERVER",
            Self::Decode(_) => "E_DECODE",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { status: Some(429 | 500..=599), .. }
        )
    }
}

fn validation_message(missing: &[String], invalid: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required fields: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("invalid values for: {}", invalid.join(", ")));
    }
    if parts.is_empty() {
        return "validation failed".to_owned();
    }
    parts.join("; ")
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
