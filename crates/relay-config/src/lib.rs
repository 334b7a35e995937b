//! # Relay Config
//!
//! Service settings and report job definitions for report-relay.
//!
//! Two documents are read at startup:
//!
//! - the service settings (TOML), loaded through [`ConfigLoader`];
//! - the job definitions (a JSON array), loaded exactly once through
//!   [`JobDefinitionStore`].

mod error;
mod job;
mod loader;
mod schema;
mod store;

pub use error::{ConfigError, DefinitionsError};
pub use job::{JobDefinition, Protocol, ReportFormat, UploadDirective};
pub use loader::ConfigLoader;
pub use schema::*;
pub use store::JobDefinitionStore;
