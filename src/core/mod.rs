//! Core data model, errors and configuration.

pub mod config;
pub mod error;
pub mod package;

pub use config::Config;
pub use error::{Diagnostic, GeneratorError, LineMapError, Phase};
pub use package::RecordPackage;
