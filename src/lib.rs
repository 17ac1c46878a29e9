//! argen - record package code generator
//!
//! Turns declarative record package descriptions into formatted Rust
//! source for the storage backends they request, with located diagnostics
//! when a template or its output is malformed.

pub mod core;
pub mod generation;
pub mod infrastructure;

pub use crate::core::error::{Diagnostic, GeneratorError, Result};
pub use crate::generation::{GeneratedFile, generate, generate_fixture, generate_meta};
