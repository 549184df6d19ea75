//! HTTP collaborators of the opsdesk console.
//!
//! [`EngineClient`] talks to the workflow engine's task endpoints and
//! [`HttpBlobStore`] performs the two-step attachment upload. Both are
//! blocking and implement the boundary traits of `opsdesk-forms`.

pub mod blob;
pub mod client;
pub mod codec;
mod http;

pub use blob::HttpBlobStore;
pub use client::EngineClient;
pub use codec::{completion_body, encode_variables};
