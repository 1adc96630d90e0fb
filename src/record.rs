//! Server records as seen by the admin client.
//!
//! DESIGN
//! ======
//! A `Record` is parsed from one element of a collection response. The full
//! JSON object is retained alongside the typed view so a record can be sent
//! back unchanged (resubmission-style deletes). Media attachments are parsed
//! per attachment role declared by the owning `ResourceSpec`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resource::ResourceSpec;

// =============================================================================
// RECORD ID
// =============================================================================

/// Server-assigned record identifier.
///
/// Backends encode ids as strings or numbers; both normalize to the string
/// form, which is also what goes back over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Read an id from a JSON value. Empty strings and non-scalar values
    /// mean "no id".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_owned())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

// =============================================================================
// MEDIA
// =============================================================================

/// A previously persisted media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub id: Option<RecordId>,
}

impl MediaRef {
    /// Parse one media value: a bare URL string, or an object carrying
    /// `image` or `url` and optionally `id`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) if !url.is_empty() => Some(Self { url: url.clone(), id: None }),
            Value::Object(obj) => {
                let url = obj
                    .get("image")
                    .or_else(|| obj.get("url"))
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())?;
                let id = obj.get("id").and_then(RecordId::from_value);
                Some(Self { url: url.to_owned(), id })
            }
            _ => None,
        }
    }

    /// Parse a media field that may hold a single value or an array.
    #[must_use]
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.iter().filter_map(Self::from_value).collect(),
            other => Self::from_value(other).into_iter().collect(),
        }
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// One entry of a remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Option<RecordId>,
    /// Persisted attachments keyed by attachment role name.
    pub media: BTreeMap<String, Vec<MediaRef>>,
    raw: Map<String, Value>,
}

impl Record {
    /// Parse a record from a collection element.
    ///
    /// # Errors
    ///
    /// Returns the offending value's JSON type name if it is not an object.
    pub fn from_value(value: Value, spec: &ResourceSpec) -> Result<Self, &'static str> {
        let Value::Object(raw) = value else {
            return Err(json_type_name(&value));
        };

        let id = raw.get(&spec.id_field).and_then(RecordId::from_value);
        let media = spec
            .attachments
            .iter()
            .map(|role| {
                let refs = raw
                    .get(&role.response_field)
                    .map(MediaRef::list_from_value)
                    .unwrap_or_default();
                (role.name.clone(), refs)
            })
            .collect();

        Ok(Self { id, media, raw })
    }

    /// Raw JSON value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.raw.get(field)
    }

    /// Field value rendered as form text: strings as-is, numbers and
    /// booleans in their JSON form. Null, arrays and objects have no
    /// text form.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        match self.raw.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn media(&self, role: &str) -> &[MediaRef] {
        self.media.get(role).map_or(&[], Vec::as_slice)
    }

    /// The record exactly as the server sent it.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.raw.clone())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
