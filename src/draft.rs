//! In-progress form state: the draft and the files selected for upload.

use std::collections::BTreeMap;
use std::path::Path;

use crate::record::{Record, RecordId};
use crate::resource::{Multiplicity, ResourceSpec};

/// Whether the draft creates a new record or updates an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Create,
    Edit(RecordId),
}

impl Mode {
    #[must_use]
    pub fn target(&self) -> Option<&RecordId> {
        match self {
            Self::Create => None,
            Self::Edit(id) => Some(id),
        }
    }
}

// =============================================================================
// LOCAL FILE
// =============================================================================

/// A file chosen locally and not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    /// Build a file from in-memory bytes; the content type is inferred from
    /// the name's extension.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_owned();
        Self { name, content_type, bytes }
    }

    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::from_bytes(name, bytes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Bytes are left out so logging a draft never dumps an image.
impl std::fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Content type for the upload, from the file extension.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// DRAFT
// =============================================================================

/// Editable copy of a record's fields plus pending uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    fields: BTreeMap<String, String>,
    files: BTreeMap<String, Vec<LocalFile>>,
}

impl Draft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the editable fields of `record`. Media is not carried over:
    /// replacing an attachment requires a fresh selection.
    #[must_use]
    pub fn from_record(record: &Record, spec: &ResourceSpec) -> Self {
        let fields = spec
            .fields
            .iter()
            .filter_map(|field| record.text(&field.name).map(|text| (field.name.clone(), text)))
            .collect();
        Self { fields, files: BTreeMap::new() }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn files(&self, role: &str) -> &[LocalFile] {
        self.files.get(role).map_or(&[], Vec::as_slice)
    }

    /// Apply a file selection to a role. Single-file roles keep only the
    /// last file of the selection; multi-file roles take the whole
    /// selection. Either way the previous selection is replaced.
    pub fn attach(&mut self, role: impl Into<String>, multiplicity: Multiplicity, selection: Vec<LocalFile>) {
        let role = role.into();
        let kept = match multiplicity {
            Multiplicity::Single => selection.into_iter().last().into_iter().collect(),
            Multiplicity::Multiple => selection,
        };
        if kept.is_empty() {
            self.files.remove(&role);
        } else {
            self.files.insert(role, kept);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.is_empty()) && self.files.is_empty()
    }
}

#[cfg(test)]
#[path = "draft_test.rs"]
mod tests;
