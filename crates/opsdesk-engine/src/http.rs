//! Shared HTTP plumbing over a blocking [`ureq::Agent`].

use std::time::Duration;

use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Longest error body excerpt carried into error messages.
const MAX_ERROR_BODY: usize = 200;

/// Builds an agent that reports non-2xx statuses as responses, so callers
/// can surface the body of engine errors.
pub(crate) fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}

/// Adds a bearer token when one is configured.
pub(crate) fn authorize<B>(req: RequestBuilder<B>, token: Option<&str>) -> RequestBuilder<B> {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => req.header("Authorization", format!("Bearer {token}")),
        None => req,
    }
}

/// A fully read response.
pub(crate) struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn read(mut resp: Response<Body>) -> Result<Self, ureq::Error> {
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Start of the body, for error messages.
    pub fn excerpt(&self) -> String {
        let body = self.body.trim();
        match body.char_indices().nth(MAX_ERROR_BODY) {
            Some((idx, _)) => format!("{}...", &body[..idx]),
            None => body.to_owned(),
        }
    }
}

/// Joins a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
