//! Infrastructure layer - concrete implementations of output ports

pub mod output;

pub use output::{FileSystemOutputService, OutputError, OutputService};
