//! Dynamic form interpreter and variable binding engine.
//!
//! Takes the recursively nested form schema handed back by the workflow
//! engine and turns it into an editable [`session::FormSession`]: option
//! lists and computed fields are resolved at runtime, externally fetched
//! data is injected before render, and on submission the edited state is
//! serialized back into the nested variable bag the engine expects, with
//! file values replaced by storage identifiers.

pub mod error;
pub mod expr;
pub mod inject;
pub mod options;
pub mod parser;
pub mod ports;
pub mod serialize;
pub mod session;
pub mod state;
pub mod types;
pub mod validate;
pub mod variables;
pub mod view;
pub mod walk;

pub use error::{EngineError, FormError, ProviderError, SerializeError, UploadError};
pub use inject::DataProvider;
pub use ports::WorkflowEngine;
pub use serialize::Uploader;
pub use session::FormSession;
pub use state::{FormState, FormValue, LocalFile, Lookup, StorageId};
pub use types::{FormComponent, FormDefinition, OptionItem};
