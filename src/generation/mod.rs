//! Generation pipeline: render, format, assemble.
//!
//! A record package flows through the [`dispatcher`], which resolves its
//! backends, renders each output unit with the [`renderer`], normalizes it
//! with the [`formatter`] and wraps the result as an [`artifact`]. Failures
//! are located in the rendered text by the [`line_map`].

pub mod artifact;
pub mod backend;
pub mod dispatcher;
pub mod formatter;
pub mod functions;
pub mod line_map;
pub mod params;
pub mod renderer;
pub mod utils;

pub use artifact::GeneratedFile;
pub use dispatcher::{Dispatcher, generate, generate_fixture, generate_meta};
pub use functions::FunctionRegistry;
pub use params::{FixtureParams, LinkedPackages, MetaParams, PackageParams};
pub use renderer::TemplateRenderer;
