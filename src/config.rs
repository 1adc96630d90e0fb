//! Client configuration parsed from environment variables.

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8002";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin without a trailing slash.
    pub base_url: String,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base_url: normalize_base_url(base_url), timeouts: Timeouts::default() }
    }

    /// Build config from environment variables, after loading `.env` if one
    /// exists.
    ///
    /// - `SITEDESK_API_BASE_URL`: API origin (falls back to
    ///   `NEXT_PUBLIC_API_BASE_URL`, then `http://127.0.0.1:8002`)
    /// - `SITEDESK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SITEDESK_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let base_url = resolve_base_url(
            std::env::var("SITEDESK_API_BASE_URL").ok().as_deref(),
            std::env::var("NEXT_PUBLIC_API_BASE_URL").ok().as_deref(),
        );
        let timeouts = Timeouts {
            request_secs: parse_secs(
                std::env::var("SITEDESK_REQUEST_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            connect_secs: parse_secs(
                std::env::var("SITEDESK_CONNECT_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
        };

        Self { base_url, timeouts }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn resolve_base_url(primary: Option<&str>, fallback: Option<&str>) -> String {
    let raw = [primary, fallback]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    normalize_base_url(raw)
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn parse_secs(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
