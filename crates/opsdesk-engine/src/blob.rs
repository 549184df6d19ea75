//! Two-step attachment upload to the blob store.
//!
//! 1. `POST {upload_url_endpoint}` issues a one-time upload target, either
//!    as a bare JSON string or as `{"uploadUrl": ".."}`;
//! 2. the file bytes are `POST`ed to that target, which answers
//!    `{"storageId": ".."}`.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use opsdesk_forms::{LocalFile, StorageId, UploadError, Uploader};

use crate::client::DEFAULT_TIMEOUT;
use crate::http::{Reply, agent, authorize};

/// Content type sent when none is declared or guessable.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// [`Uploader`] over the blob store's HTTP API.
pub struct HttpBlobStore {
    upload_url_endpoint: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpBlobStore {
    pub fn new(upload_url_endpoint: impl Into<String>) -> Self {
        Self {
            upload_url_endpoint: upload_url_endpoint.into(),
            token: None,
            agent: agent(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent(timeout);
        self
    }

    /// Step 1: obtain a one-time upload URL.
    fn upload_target(&self) -> Result<String, UploadError> {
        let resp = authorize(self.agent.post(&self.upload_url_endpoint), self.token.as_deref())
            .send_empty()
            .map_err(|e| UploadError::Target(e.to_string()))?;
        let reply = Reply::read(resp).map_err(|e| UploadError::Target(e.to_string()))?;
        if !reply.is_success() {
            return Err(UploadError::Target(format!(
                "status {}: {}",
                reply.status,
                reply.excerpt()
            )));
        }
        let value: Value = serde_json::from_str(&reply.body)
            .map_err(|e| UploadError::Target(format!("invalid response: {e}")))?;
        let url = match &value {
            Value::String(url) => Some(url.as_str()),
            Value::Object(map) => map.get("uploadUrl").and_then(Value::as_str),
            _ => None,
        }
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| UploadError::Target("response carries no upload URL".into()))?;
        Ok(resolve_target(&self.upload_url_endpoint, url.trim()))
    }
}

impl Uploader for HttpBlobStore {
    fn upload(&self, file: &LocalFile) -> Result<Option<StorageId>, UploadError> {
        let bytes = std::fs::read(&file.path).map_err(|source| UploadError::Read {
            path: file.path.display().to_string(),
            source,
        })?;
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(&file.path).to_owned());

        let target = self.upload_target()?;
        info!(file = %file.name, size = bytes.len(), %content_type, "uploading attachment");

        let resp = self
            .agent
            .post(&target)
            .header("Content-Type", content_type.as_str())
            .send(&bytes[..])
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let reply = Reply::read(resp).map_err(|e| UploadError::Transport(e.to_string()))?;
        if !reply.is_success() {
            return Err(UploadError::Status { code: reply.status });
        }

        let value: Value =
            serde_json::from_str(&reply.body).map_err(|e| UploadError::Decode(e.to_string()))?;
        let id = value
            .get("storageId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| StorageId(id.to_owned()));
        if id.is_none() {
            debug!(file = %file.name, "blob store returned no storage id");
        }
        Ok(id)
    }
}

impl std::fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("upload_url_endpoint", &self.upload_url_endpoint)
            .finish_non_exhaustive()
    }
}

/// Resolves a root-relative target against the endpoint's origin.
fn resolve_target(endpoint: &str, target: &str) -> String {
    if !target.starts_with('/') {
        return target.to_owned();
    }
    let origin_end = endpoint
        .find("://")
        .map(|scheme| {
            let host_start = scheme + 3;
            endpoint[host_start..]
                .find('/')
                .map_or(endpoint.len(), |i| host_start + i)
        })
        .unwrap_or(0);
    format!("{}{target}", &endpoint[..origin_end])
}

/// Guesses a content type from the file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
