//! Error types for the form interpreter and its collaborators.
//!
//! Render-path problems (unknown component types, expression failures,
//! provider failures) are not errors: they are logged and degrade locally.
//! Only the submit path and the collaborator boundaries return these.

use crate::state::StorageId;

/// Errors loading a form definition or applying operator input to it.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The schema document could not be parsed at all.
    #[error("form parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No bound field exists at the given path.
    #[error("no field bound at {path}")]
    UnknownField { path: String },

    /// The raw input cannot be coerced to the field's value type.
    #[error("invalid value for {path}: {message}")]
    InvalidInput { path: String, message: String },
}

/// Result alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;

impl FormError {
    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by the workflow engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The task has no engine-side identifier to address.
    #[error("task has no external identifier")]
    MissingTaskId,

    /// The engine answered with a non-success status.
    #[error("engine returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never produced a response.
    #[error("engine transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("engine response decode error: {0}")]
    Decode(String),
}

impl EngineError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            Self::MissingTaskId | Self::Decode(_) => false,
        }
    }
}

/// Failure of the internal data provider for one reference.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("data provider failed for {reference}: {message}")]
    Backend { reference: String, message: String },

    /// The variables needed by the reference are missing.
    #[error("reference {reference} requires variable {variable}")]
    MissingVariable { reference: String, variable: String },
}

impl ProviderError {
    pub fn backend(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single attachment upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// No upload target could be obtained from the blob store.
    #[error("no upload target available: {0}")]
    Target(String),

    /// The blob store answered with a non-success status.
    #[error("blob store returned status {code}")]
    Status { code: u16 },

    #[error("upload transport error: {0}")]
    Transport(String),

    #[error("upload response decode error: {0}")]
    Decode(String),
}

impl UploadError {
    /// Returns `true` if retrying the upload may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Target(_) => true,
            Self::Status { code } => *code >= 500 || *code == 429,
            Self::Read { .. } | Self::Decode(_) => false,
        }
    }
}

/// Failure while building the submission payload.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// An upload failed. `uploaded` lists every identifier obtained in this
    /// submission before the failure, in upload order.
    #[error("upload failed for field {field}: {source}")]
    Upload {
        field: String,
        uploaded: Vec<StorageId>,
        #[source]
        source: UploadError,
    },
}

impl SerializeError {
    /// Identifiers already stored before the failing upload.
    pub fn uploaded(&self) -> &[StorageId] {
        match self {
            Self::Upload { uploaded, .. } => uploaded,
        }
    }
}
