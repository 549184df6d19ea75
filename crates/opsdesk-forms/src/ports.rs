//! Workflow engine boundary.

use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::types::FormDefinition;

/// The external workflow engine: supplies form schemas and accepts
/// task completions. Transport and authentication live in the implementor.
pub trait WorkflowEngine {
    /// Fetches the deployed form of the task with engine id `external_id`.
    fn fetch_form(
        &self,
        external_id: &str,
        variables: &Value,
    ) -> Result<FormDefinition, EngineError>;

    /// Completes the task with the serialized variable bag.
    fn complete(
        &self,
        external_id: &str,
        variables: &Map<String, Value>,
    ) -> Result<(), EngineError>;
}
