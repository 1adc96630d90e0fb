//! Transport seam between the controller and the remote collection API.
//!
//! The controller only speaks `CollectionApi`; `HttpApi` is the production
//! implementation and tests substitute recording mocks.

use serde_json::Value;

use crate::draft::LocalFile;
use crate::error::ControllerError;
use crate::record::RecordId;
use crate::resource::ResourceSpec;

/// One part of a multipart upsert body, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: LocalFile },
}

impl FormPart {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }

    /// Text value, if this is a text part.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { value, .. } => Some(value),
            Self::File { .. } => None,
        }
    }
}

/// A delete, shaped by the resource's delete contract.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteRequest {
    /// Remove one record through a delete-by-id endpoint.
    ById(RecordId),
    /// Replace the collection with the records that remain.
    Resubmit { target: RecordId, remaining: Vec<Value> },
}

impl DeleteRequest {
    #[must_use]
    pub fn target(&self) -> &RecordId {
        match self {
            Self::ById(id) | Self::Resubmit { target: id, .. } => id,
        }
    }
}

/// Remote operations on one resource collection.
#[async_trait::async_trait]
pub trait CollectionApi: Send + Sync {
    /// Fetch the whole collection, in server order.
    ///
    /// # Errors
    ///
    /// `Network` when the request cannot complete, `Server` for non-success
    /// responses, `Decode` when the body is not a collection envelope.
    async fn list(&self, spec: &ResourceSpec) -> Result<Vec<Value>, ControllerError>;

    /// Create or update a record. An id part in `parts` makes it an update.
    ///
    /// # Errors
    ///
    /// `Network` or `Server`, as for [`CollectionApi::list`].
    async fn upsert(&self, spec: &ResourceSpec, parts: Vec<FormPart>) -> Result<(), ControllerError>;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// `Network` or `Server`, as for [`CollectionApi::list`].
    async fn delete(&self, spec: &ResourceSpec, request: DeleteRequest) -> Result<(), ControllerError>;
}
