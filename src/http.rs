//! HTTP implementation of `CollectionApi` over reqwest.
//!
//! RESPONSE CONTRACT
//! =================
//! Collection reads return `{ "success": bool, "<list_field>": [...] }`.
//! Mutations return any 2xx. Failures may carry a `message` which is passed
//! to the user verbatim; otherwise a generic message names the status.

use std::time::Duration;

use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::ControllerError;
use crate::record::RecordId;
use crate::resource::{DeleteContract, ResourceSpec};
use crate::transport::{CollectionApi, DeleteRequest, FormPart};

pub struct HttpApi {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpApi {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Network`] if the HTTP client cannot be
    /// constructed (TLS backend initialization).
    pub fn new(config: ClientConfig) -> Result<Self, ControllerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ControllerError::Network(format!("http client build failed: {e}")))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ControllerError> {
        let response = request
            .send()
            .await
            .map_err(|e| ControllerError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ControllerError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ControllerError::Server {
                status: Some(status.as_u16()),
                message: server_message(&body).unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16())),
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl CollectionApi for HttpApi {
    async fn list(&self, spec: &ResourceSpec) -> Result<Vec<Value>, ControllerError> {
        let url = self.config.url(&spec.list_path);
        tracing::debug!(resource = %spec.name, %url, "list request");
        let body = self.send(self.http.get(url)).await?;
        parse_list_envelope(&body, &spec.list_field)
    }

    async fn upsert(&self, spec: &ResourceSpec, parts: Vec<FormPart>) -> Result<(), ControllerError> {
        let url = self.config.url(&spec.upsert_path);
        tracing::debug!(resource = %spec.name, %url, parts = parts.len(), "upsert request");
        let form = build_form(parts)?;
        let body = self.send(self.http.post(url).multipart(form)).await?;
        check_ack(&body)
    }

    async fn delete(&self, spec: &ResourceSpec, request: DeleteRequest) -> Result<(), ControllerError> {
        let url = delete_url(&self.config, &spec.delete, request.target())?;
        tracing::debug!(resource = %spec.name, %url, id = %request.target(), "delete request");

        let builder = match (&spec.delete, request) {
            (DeleteContract::Resubmit { list_field, .. }, DeleteRequest::Resubmit { remaining, .. }) => {
                let mut body = Map::new();
                body.insert(list_field.clone(), Value::Array(remaining));
                self.http.post(url).json(&Value::Object(body))
            }
            (DeleteContract::ById { .. }, DeleteRequest::ById(_)) => self.http.delete(url),
            (contract, request) => {
                return Err(ControllerError::InvalidArgument(format!(
                    "delete request {request:?} does not match contract {contract:?}"
                )));
            }
        };

        let body = self.send(builder).await?;
        check_ack(&body)
    }
}

// =============================================================================
// WIRE HELPERS
// =============================================================================

/// Absolute URL for deleting `id` under `contract`.
///
/// For delete-by-id the id becomes one percent-encoded path segment, so
/// ids containing `/`, `?` or spaces cannot change the route.
///
/// # Errors
///
/// [`ControllerError::InvalidArgument`] if the configured base URL and path
/// do not form a valid URL.
pub fn delete_url(config: &ClientConfig, contract: &DeleteContract, id: &RecordId) -> Result<Url, ControllerError> {
    let (head, tail) = match contract {
        DeleteContract::Resubmit { path, .. } => return Url::parse(&config.url(path)).map_err(invalid_url),
        DeleteContract::ById { path } => path.split_once("{id}").unwrap_or((path.as_str(), "")),
    };

    let mut url = Url::parse(&config.url(head.trim_end_matches('/'))).map_err(invalid_url)?;
    url.path_segments_mut()
        .map_err(|()| invalid_url("base url cannot carry a path"))?
        .pop_if_empty()
        .push(id.as_str())
        .extend(tail.split('/').filter(|segment| !segment.is_empty()));
    Ok(url)
}

fn invalid_url(e: impl std::fmt::Display) -> ControllerError {
    ControllerError::InvalidArgument(format!("delete url: {e}"))
}

fn build_form(parts: Vec<FormPart>) -> Result<Form, ControllerError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File { name, file } => {
                let content_type = file.content_type.clone();
                let part = Part::bytes(file.bytes)
                    .file_name(file.name)
                    .mime_str(&content_type)
                    .map_err(|e| ControllerError::InvalidArgument(format!("content type {content_type}: {e}")))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

/// Extract the collection from a list response.
///
/// A bare JSON array is accepted as the collection itself. For envelopes,
/// `success: false` is a server failure; the array is read from
/// `list_field`, falling back to `data`; a missing or null array is an
/// empty collection.
///
/// # Errors
///
/// [`ControllerError::Server`] for `success: false`, [`ControllerError::Decode`]
/// for non-JSON bodies or a collection that is not an array.
pub fn parse_list_envelope(body: &str, list_field: &str) -> Result<Vec<Value>, ControllerError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ControllerError::Decode(e.to_string()))?;

    let obj = match value {
        Value::Array(items) => return Ok(items),
        Value::Object(obj) => obj,
        other => return Err(ControllerError::Decode(format!("expected an object, got {other}"))),
    };

    if obj.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ControllerError::Server {
            status: None,
            message: message_of(&obj).unwrap_or_else(|| "failed to fetch records".to_owned()),
        });
    }

    match obj.get(list_field).or_else(|| obj.get("data")) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(ControllerError::Decode(format!("`{list_field}` is not an array"))),
    }
}

/// Check a mutation response. Empty and non-JSON 2xx bodies count as
/// success; a JSON body with `success: false` does not.
///
/// # Errors
///
/// [`ControllerError::Server`] when the body reports failure.
pub fn check_ack(body: &str) -> Result<(), ControllerError> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) else {
        return Ok(());
    };
    if obj.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ControllerError::Server {
            status: None,
            message: message_of(&obj).unwrap_or_else(|| "request failed".to_owned()),
        });
    }
    Ok(())
}

/// The `message` of an error body, if it has one.
#[must_use]
pub fn server_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Object(obj) => message_of(&obj),
        _ => None,
    }
}

fn message_of(obj: &Map<String, Value>) -> Option<String> {
    obj.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
