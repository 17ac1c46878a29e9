//! Storage backends and their resolution from declared identifiers.
//!
//! Record packages name their backends with plain strings. Those strings
//! are resolved through a fixed table into one of three outcomes:
//! an implemented generator family, a recognized identifier that has no
//! generator yet, or an unknown identifier. Adding a backend means adding a
//! table row and a [`BackendGenerator`]; dispatch itself does not change.

pub mod octopus;

use std::fmt;

use crate::core::error::Diagnostic;
use crate::generation::params::PackageParams;
use crate::generation::renderer::TemplateRenderer;

/// Implemented generator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Octopus,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Octopus => "octopus",
        }
    }

    /// The generator implementing this family
    pub fn generator(&self) -> &'static dyn BackendGenerator {
        match self {
            BackendKind::Octopus => &octopus::OctopusGenerator,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a backend identifier resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Implemented(BackendKind),
    NotImplemented,
    Unknown,
}

/// Identifier vocabulary. Case-sensitive; legacy and current names of the
/// same store resolve to the same outcome.
const RESOLUTION_TABLE: &[(&str, Resolution)] = &[
    ("octopus", Resolution::Implemented(BackendKind::Octopus)),
    ("tarantool15", Resolution::Implemented(BackendKind::Octopus)),
    ("tarantool16", Resolution::NotImplemented),
    ("tarantool2", Resolution::NotImplemented),
];

/// Resolve a declared backend identifier.
pub fn resolve(identifier: &str) -> Resolution {
    RESOLUTION_TABLE
        .iter()
        .find(|(name, _)| *name == identifier)
        .map_or(Resolution::Unknown, |(_, resolution)| *resolution)
}

/// Every identifier the resolver recognizes, implemented or not
pub fn known_identifiers() -> impl Iterator<Item = &'static str> {
    RESOLUTION_TABLE.iter().map(|(name, _)| *name)
}

/// A rendered, not yet formatted, output of a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    /// Output key; the file name is derived from it
    pub name: String,
    pub data: Vec<u8>,
}

impl RenderedUnit {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Per-family generation logic
pub trait BackendGenerator: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Render every output unit of the family, in a stable order.
    fn generate(
        &self,
        renderer: &TemplateRenderer<'_>,
        params: &PackageParams<'_>,
    ) -> Result<Vec<RenderedUnit>, Diagnostic>;
}
