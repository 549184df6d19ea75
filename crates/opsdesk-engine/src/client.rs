//! REST client of the workflow engine.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use opsdesk_forms::parser::parse_value;
use opsdesk_forms::{EngineError, FormDefinition, WorkflowEngine};

use crate::codec::completion_body;
use crate::http::{Reply, agent, authorize, join_url};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the engine's task endpoints.
pub struct EngineClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl EngineClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            agent: agent(DEFAULT_TIMEOUT),
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self, external_id: &str, action: &str) -> String {
        join_url(
            &self.base_url,
            &format!("engine-rest/task/{external_id}/{action}"),
        )
    }
}

fn task_id(external_id: &str) -> Result<&str, EngineError> {
    let id = external_id.trim();
    if id.is_empty() {
        return Err(EngineError::MissingTaskId);
    }
    Ok(id)
}

fn transport(e: ureq::Error) -> EngineError {
    EngineError::Transport(e.to_string())
}

fn check(reply: &Reply) -> Result<(), EngineError> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(EngineError::status(reply.status, reply.excerpt()))
    }
}

impl WorkflowEngine for EngineClient {
    /// `GET {base}/engine-rest/task/{id}/deployed-form`. Variables are not
    /// sent; the engine resolves the deployed form from the task alone.
    fn fetch_form(
        &self,
        external_id: &str,
        _variables: &Value,
    ) -> Result<FormDefinition, EngineError> {
        let id = task_id(external_id)?;
        let url = self.task_url(id, "deployed-form");
        info!(task = id, %url, "fetching deployed form");

        let resp = authorize(self.agent.get(&url), self.token.as_deref())
            .header("Accept", "application/json")
            .call()
            .map_err(transport)?;
        let reply = Reply::read(resp).map_err(transport)?;
        check(&reply)?;

        let value: Value =
            serde_json::from_str(&reply.body).map_err(|e| EngineError::Decode(e.to_string()))?;
        let mut definition = parse_value(&value).map_err(|e| EngineError::Decode(e.to_string()))?;
        definition.source = url;
        debug!(task = id, components = definition.components.len(), "form schema received");
        Ok(definition)
    }

    /// `POST {base}/engine-rest/task/{id}/complete` with the encoded bag.
    fn complete(
        &self,
        external_id: &str,
        variables: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let id = task_id(external_id)?;
        let url = self.task_url(id, "complete");
        info!(task = id, variables = variables.len(), "completing task");

        let body = completion_body(variables);
        let resp = authorize(self.agent.post(&url), self.token.as_deref())
            .send_json(&body)
            .map_err(transport)?;
        let reply = Reply::read(resp).map_err(transport)?;
        check(&reply)?;
        debug!(task = id, status = reply.status, "task completed");
        Ok(())
    }
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}
