//! Per-package backend dispatch plus the meta and fixture paths.
//!
//! Each requested backend identifier is resolved, rendered and formatted
//! in declaration order. The first failure aborts the package: callers
//! get either every artifact or a single annotated error.

use tracing::{debug, info};

use crate::core::error::{Diagnostic, GeneratorError, Phase, Result};
use crate::core::package::RecordPackage;
use crate::generation::artifact::{self, FIXTURE_BACKEND, GeneratedFile, META_BACKEND, META_FILE};
use crate::generation::backend::{self, Resolution};
use crate::generation::formatter;
use crate::generation::line_map;
use crate::generation::params::{FixtureParams, LinkedPackages, MetaParams, PackageParams};
use crate::generation::renderer::TemplateRenderer;

pub const META_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/meta.rs.tera"));

pub const FIXTURE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/fixture.rs.tera"));

/// Drives rendering and formatting for record packages
#[derive(Clone, Copy)]
pub struct Dispatcher<'r> {
    renderer: TemplateRenderer<'r>,
}

impl Default for Dispatcher<'static> {
    fn default() -> Self {
        Self::new(TemplateRenderer::default())
    }
}

impl<'r> Dispatcher<'r> {
    pub fn new(renderer: TemplateRenderer<'r>) -> Self {
        Self { renderer }
    }

    /// Generate every backend output of `pkg`.
    ///
    /// `links` holds the packages that field objects may point at.
    pub fn generate(
        &self,
        app_info: &str,
        pkg: &RecordPackage,
        links: &LinkedPackages,
    ) -> Result<Vec<GeneratedFile>> {
        let name = pkg.display_name();
        let mut files = Vec::new();

        for identifier in &pkg.backends {
            let kind = match backend::resolve(identifier) {
                Resolution::Implemented(kind) => kind,
                Resolution::NotImplemented => {
                    return Err(GeneratorError::BackendNotImplemented {
                        name: name.to_string(),
                        backend: identifier.clone(),
                    });
                }
                Resolution::Unknown => {
                    return Err(GeneratorError::BackendUnknown {
                        name: name.to_string(),
                        backend: identifier.clone(),
                    });
                }
            };

            let attribute = |diag: Diagnostic| Diagnostic {
                backend: identifier.clone(),
                ..diag
            }
            .with_name(name);

            let params = PackageParams::new(app_info, pkg).with_links(links);
            let units = kind
                .generator()
                .generate(&self.renderer, &params)
                .map_err(attribute)?;

            for unit in units {
                let file_name = artifact::backend_file_name(&unit.name);
                let data = format_unit(identifier, &file_name, unit.data).map_err(attribute)?;
                debug!(
                    package = %name,
                    backend = %identifier,
                    file = %file_name,
                    bytes = data.len(),
                    "Formatted backend output"
                );
                files.push(GeneratedFile::for_backend(
                    &pkg.namespace.package_name,
                    &unit.name,
                    identifier,
                    data,
                ));
            }
        }

        info!(package = %name, files = files.len(), "Generated record package");
        Ok(files)
    }

    /// Generate the repository-level file listing every package.
    pub fn generate_meta(&self, params: &MetaParams<'_>) -> Result<GeneratedFile> {
        let raw = self
            .renderer
            .render(META_BACKEND, META_TEMPLATE, params)
            .map_err(|diag| diag.with_name(META_FILE).with_filename(META_FILE))?;
        let data =
            format_unit(META_BACKEND, META_FILE, raw).map_err(|diag| diag.with_name(META_FILE))?;

        info!(packages = params.namespaces.len(), "Generated repository meta");
        Ok(GeneratedFile::meta(data))
    }

    /// Generate the fixture loader of `pkg` inside the `fixture_pkg` module.
    pub fn generate_fixture(
        &self,
        app_info: &str,
        pkg: &RecordPackage,
        fixture_pkg: &str,
    ) -> Result<GeneratedFile> {
        let name = pkg.display_name();
        let ar_pkg = pkg.namespace.package_name.as_str();
        let file_name = artifact::fixture_file_name(ar_pkg);

        let params = FixtureParams::new(app_info, pkg, ar_pkg, fixture_pkg);
        let raw = self
            .renderer
            .render(FIXTURE_BACKEND, FIXTURE_TEMPLATE, &params)
            .map_err(|diag| diag.with_name(name))?;
        let data =
            format_unit(FIXTURE_BACKEND, &file_name, raw).map_err(|diag| diag.with_name(name))?;

        info!(package = %name, fixture = %fixture_pkg, "Generated fixture");
        Ok(GeneratedFile::fixture(fixture_pkg, ar_pkg, data))
    }
}

/// Normalize a rendered buffer. Failures are located against `raw`, the
/// buffer the formatter actually saw.
pub fn format_unit(
    backend: &str,
    file_name: &str,
    raw: Vec<u8>,
) -> std::result::Result<Vec<u8>, Diagnostic> {
    formatter::normalize(&raw).map_err(|err| {
        let text = String::from_utf8_lossy(&raw);
        Diagnostic::new(backend, Phase::Format, line_map::annotate(err, &text))
            .with_filename(file_name)
    })
}

/// [`Dispatcher::generate`] with the standard function registry
pub fn generate(
    app_info: &str,
    pkg: &RecordPackage,
    links: &LinkedPackages,
) -> Result<Vec<GeneratedFile>> {
    Dispatcher::default().generate(app_info, pkg, links)
}

/// [`Dispatcher::generate_meta`] with the standard function registry
pub fn generate_meta(params: &MetaParams<'_>) -> Result<GeneratedFile> {
    Dispatcher::default().generate_meta(params)
}

/// [`Dispatcher::generate_fixture`] with the standard function registry
pub fn generate_fixture(
    app_info: &str,
    pkg: &RecordPackage,
    fixture_pkg: &str,
) -> Result<GeneratedFile> {
    Dispatcher::default().generate_fixture(app_info, pkg, fixture_pkg)
}
