//! Resource configuration: what one managed collection looks like.
//!
//! DESIGN
//! ======
//! About, Portfolio and Reviews differ only in endpoints, field names,
//! attachment roles and response shape. `ResourceSpec` captures exactly
//! those differences so one controller serves all three. Specs are plain
//! serde data; a backend with other paths can be described in JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, Mode};
use crate::error::ControllerError;
use crate::transport::FormPart;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    LongText,
    /// Yes/no value; normalized to `true`/`false` on the wire.
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    Single,
    Multiple,
}

/// An attachment slot, such as a cover image or a gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRole {
    pub name: String,
    /// Multipart field name for uploads. Defaults to `name`.
    #[serde(default)]
    pub form_field: String,
    /// Response key holding persisted media. Defaults to `name`.
    #[serde(default)]
    pub response_field: String,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Drop the record locally before the server confirms; reload on failure.
    Optimistic,
    /// Wait for the server, then reload.
    #[default]
    Confirmed,
}

/// How the backend expects a delete to be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeleteContract {
    /// `DELETE` on `path`, with `{id}` replaced by the percent-encoded
    /// record id (appended as a last segment when there is no `{id}`).
    ById { path: String },
    /// `POST` the remaining collection as `{ <list_field>: [...] }` to `path`.
    Resubmit { path: String, list_field: String },
}

/// Configuration of one managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub list_path: String,
    pub upsert_path: String,
    pub delete: DeleteContract,
    #[serde(default = "default_list_field")]
    pub list_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRole>,
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

fn default_list_field() -> String {
    "data".to_owned()
}

fn default_id_field() -> String {
    "id".to_owned()
}

/// Problems with a resource description loaded from disk.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("failed to read resource spec: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse resource spec: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid resource spec: {0}")]
    Invalid(String),
}

// =============================================================================
// PRESETS
// =============================================================================

fn text(name: &str) -> FieldSpec {
    FieldSpec { name: name.to_owned(), kind: FieldKind::Text, required: true }
}

fn long_text(name: &str) -> FieldSpec {
    FieldSpec { name: name.to_owned(), kind: FieldKind::LongText, required: true }
}

fn role(name: &str, response_field: &str, multiplicity: Multiplicity, required: bool) -> AttachmentRole {
    AttachmentRole {
        name: name.to_owned(),
        form_field: name.to_owned(),
        response_field: response_field.to_owned(),
        multiplicity,
        required,
    }
}

impl ResourceSpec {
    /// The "About Us" block: a description with a gallery of images.
    #[must_use]
    pub fn about() -> Self {
        Self {
            name: "about".to_owned(),
            list_path: "/api/admin/get-aboutUs-info".to_owned(),
            upsert_path: "/api/admin/add-aboutUs-info".to_owned(),
            delete: DeleteContract::ById { path: "/api/admin/delete-about-info/{id}".to_owned() },
            list_field: default_list_field(),
            id_field: default_id_field(),
            fields: vec![long_text("description")],
            attachments: vec![role("images", "aboutUsImages", Multiplicity::Multiple, false)],
            delete_policy: DeletePolicy::Confirmed,
        }
    }

    /// Portfolio items: a cover thumbnail plus an optional image gallery.
    #[must_use]
    pub fn portfolio() -> Self {
        Self {
            name: "portfolio".to_owned(),
            list_path: "/api/admin/get-portfolio-data".to_owned(),
            upsert_path: "/api/admin/add-portfolio-data".to_owned(),
            delete: DeleteContract::ById { path: "/api/admin/delete-portfolio-data/{id}".to_owned() },
            list_field: default_list_field(),
            id_field: default_id_field(),
            fields: vec![
                text("category"),
                text("title"),
                long_text("description"),
                FieldSpec { name: "onLandingPage".to_owned(), kind: FieldKind::Flag, required: true },
            ],
            attachments: vec![
                role("thumbnail", "thumbnail", Multiplicity::Single, true),
                role("portfolioImages", "portfolioImages", Multiplicity::Multiple, false),
            ],
            delete_policy: DeletePolicy::Confirmed,
        }
    }

    /// Client testimonials.
    #[must_use]
    pub fn reviews() -> Self {
        Self {
            name: "reviews".to_owned(),
            list_path: "/api/admin/get-testimonials".to_owned(),
            upsert_path: "/api/admin/add-testimonials".to_owned(),
            delete: DeleteContract::Resubmit {
                path: "/api/admin/add-reviews".to_owned(),
                list_field: "reviews".to_owned(),
            },
            list_field: "testimonials".to_owned(),
            id_field: default_id_field(),
            fields: vec![text("name"), text("designation"), long_text("comment")],
            attachments: vec![role("testimonialImage", "testimonialImage", Multiplicity::Single, true)],
            delete_policy: DeletePolicy::Optimistic,
        }
    }

    /// All built-in resources, in menu order.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![Self::portfolio(), Self::about(), Self::reviews()]
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Parse and check a JSON resource description.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Parse`] for malformed JSON and
    /// [`SpecError::Invalid`] for inconsistent descriptions.
    pub fn from_json_str(raw: &str) -> Result<Self, SpecError> {
        let mut spec: Self = serde_json::from_str(raw)?;
        for role in &mut spec.attachments {
            if role.form_field.is_empty() {
                role.form_field.clone_from(&role.name);
            }
            if role.response_field.is_empty() {
                role.response_field.clone_from(&role.name);
            }
        }
        spec.check()?;
        Ok(spec)
    }

    /// Read a JSON resource description from disk.
    ///
    /// # Errors
    ///
    /// As [`ResourceSpec::from_json_str`], plus [`SpecError::Io`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn check(&self) -> Result<(), SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::Invalid("name must not be empty".into()));
        }
        if self.list_path.is_empty() || self.upsert_path.is_empty() {
            return Err(SpecError::Invalid(format!("{}: list_path and upsert_path are required", self.name)));
        }
        let mut seen = std::collections::HashSet::new();
        let names = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.attachments.iter().map(|a| a.name.as_str()));
        for name in names {
            if name.is_empty() || name == self.id_field {
                return Err(SpecError::Invalid(format!("{}: invalid field name '{name}'", self.name)));
            }
            if !seen.insert(name) {
                return Err(SpecError::Invalid(format!("{}: duplicate field '{name}'", self.name)));
            }
        }
        Ok(())
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn attachment(&self, name: &str) -> Option<&AttachmentRole> {
        self.attachments.iter().find(|a| a.name == name)
    }

    /// Names of everything that must be filled before submission.
    #[must_use]
    pub fn required_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .chain(self.attachments.iter().filter(|a| a.required).map(|a| a.name.as_str()))
            .collect()
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    /// Check a draft before submission.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Validation`] naming every missing required
    /// field or attachment and every flag value that does not parse.
    pub fn validate(&self, draft: &Draft) -> Result<(), ControllerError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        for field in &self.fields {
            let value = draft.field(&field.name).map(str::trim).unwrap_or_default();
            if value.is_empty() {
                if field.required {
                    missing.push(field.name.clone());
                }
                continue;
            }
            if field.kind == FieldKind::Flag && parse_flag(value).is_none() {
                invalid.push(field.name.clone());
            }
        }

        for role in &self.attachments {
            if role.required && draft.files(&role.name).is_empty() {
                missing.push(role.name.clone());
            }
        }

        if missing.is_empty() && invalid.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::validation(missing, invalid))
        }
    }

    /// Serialize a validated draft into multipart parts.
    ///
    /// The id part is present if and only if `mode` is an edit; it is the
    /// upsert endpoint's create/update discriminator. Blank fields are
    /// omitted; text is sent exactly as entered.
    #[must_use]
    pub fn build_payload(&self, draft: &Draft, mode: &Mode) -> Vec<FormPart> {
        let mut parts = Vec::new();

        if let Some(id) = mode.target() {
            parts.push(FormPart::Text { name: self.id_field.clone(), value: id.to_string() });
        }

        for field in &self.fields {
            let raw = draft.field(&field.name).unwrap_or_default();
            if raw.trim().is_empty() {
                continue;
            }
            let value = match field.kind {
                FieldKind::Flag => parse_flag(raw).map_or_else(|| raw.to_owned(), |b| b.to_string()),
                FieldKind::Text | FieldKind::LongText => raw.to_owned(),
            };
            parts.push(FormPart::Text { name: field.name.clone(), value });
        }

        for role in &self.attachments {
            for file in draft.files(&role.name) {
                parts.push(FormPart::File { name: role.form_field.clone(), file: file.clone() });
            }
        }

        parts
    }
}

/// Interpret a yes/no answer.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "resource_test.rs"]
mod tests;
