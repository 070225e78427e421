pub mod config;
pub mod error;
pub mod text;
pub mod models;
pub mod registry;
pub mod storage;
pub mod dictionary;
pub mod content;
pub mod orchestrator;

pub use error::{LookupError, LookupResult};
pub use orchestrator::{QueryOrchestrator, SearchServices};
