//! Console error taxonomy for the fetch and submit paths.

use opsdesk_forms::validate::FieldIssue;
use opsdesk_forms::{EngineError, SerializeError, StorageId, UploadError};
use opsdesk_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// No task with a loaded form is selected.
    #[error("no form is loaded for the selected task")]
    NoActiveForm,

    /// The schema could not be fetched; the form is not rendered.
    #[error("could not load the form: {0}")]
    SchemaFetch(#[source] EngineError),

    /// Field validation blocked the submission.
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<FieldIssue>),

    /// An attachment upload failed; the completion call was not issued.
    #[error("upload failed for field {field}: {source}")]
    Upload {
        field: String,
        /// Identifiers stored before the failure.
        uploaded: Vec<StorageId>,
        #[source]
        source: UploadError,
    },

    /// The engine rejected the completion; the task stays pending.
    #[error("the engine rejected the completion: {0}")]
    Completion(#[source] EngineError),

    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Convenience alias used throughout the console crate.
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl From<SerializeError> for ConsoleError {
    fn from(e: SerializeError) -> Self {
        match e {
            SerializeError::Upload {
                field,
                uploaded,
                source,
            } => Self::Upload {
                field,
                uploaded,
                source,
            },
        }
    }
}

impl ConsoleError {
    /// Returns `true` if the operator should be offered a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SchemaFetch(_) | Self::Upload { .. } | Self::Completion(_)
        )
    }
}
