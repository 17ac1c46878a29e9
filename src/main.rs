//! argen CLI entrypoint
//! Loads record package declarations and writes the generated sources.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use argen::core::{Config, RecordPackage};
use argen::generation::backend::{self, Resolution};
use argen::generation::{GeneratedFile, LinkedPackages, MetaParams, generate, generate_fixture, generate_meta};
use argen::infrastructure::{FileSystemOutputService, OutputService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// External imports (alphabetized)
use anyhow::{Context, bail};
use clap::Parser;
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "argen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate sources for record package declarations
    Generate {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Root directory for generated files (overrides the config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Text embedded in the banner of every file (overrides the config)
        #[arg(long)]
        app_info: Option<String>,
        /// Module receiving fixture loaders (overrides the config)
        #[arg(long)]
        fixture_package: Option<String>,
        /// Skip the repository-level meta file
        #[arg(long)]
        no_meta: bool,
        /// Declaration files (YAML, or JSON by extension)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the backend identifiers the generator recognizes
    Backends,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            config,
            output_dir,
            app_info,
            fixture_package,
            no_meta,
            files,
        } => {
            let mut cfg = match &config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            if let Some(info) = app_info {
                cfg.app_info = info;
            }
            if fixture_package.is_some() {
                cfg.fixture_package = fixture_package;
            }
            if no_meta {
                cfg.meta = false;
            }

            run_generate(cfg, &files).await
        }
        Commands::Backends => {
            for id in backend::known_identifiers() {
                let status = match backend::resolve(id) {
                    Resolution::Implemented(kind) => format!("implemented ({kind})"),
                    Resolution::NotImplemented => "not implemented".to_string(),
                    Resolution::Unknown => "unknown".to_string(),
                };
                println!("{id:<12} {status}");
            }
            Ok(())
        }
    }
}

async fn run_generate(cfg: Config, files: &[PathBuf]) -> anyhow::Result<()> {
    info!(
        packages = files.len(),
        output_dir = %cfg.output_dir.display(),
        "Starting generation"
    );

    let mut packages = Vec::with_capacity(files.len());
    for path in files {
        packages.push(read_package(path).await?);
    }

    let links: Arc<LinkedPackages> = Arc::new(
        packages
            .iter()
            .map(|pkg| (pkg.namespace.package_name.clone(), pkg.clone()))
            .collect(),
    );
    let cfg = Arc::new(cfg);

    let mut workers = Vec::with_capacity(packages.len());
    for pkg in packages.iter().cloned() {
        let links = Arc::clone(&links);
        let cfg = Arc::clone(&cfg);
        workers.push(tokio::task::spawn_blocking(move || {
            let mut out = generate(&cfg.app_info, &pkg, &links)?;
            if let Some(fixture_pkg) = &cfg.fixture_package {
                out.push(generate_fixture(&cfg.app_info, &pkg, fixture_pkg)?);
            }
            Ok::<_, argen::GeneratorError>(out)
        }));
    }

    let mut generated: Vec<GeneratedFile> = Vec::new();
    for worker in workers {
        generated.extend(worker.await.context("generation worker panicked")??);
    }

    if cfg.meta {
        generated.push(generate_meta(&MetaParams::new(&cfg.app_info, &packages))?);
    }

    let output = FileSystemOutputService::new(&cfg.output_dir);
    output.ensure_directory(output.root()).await?;
    output.write_files(&generated).await?;

    info!(files = generated.len(), "Generation complete");
    Ok(())
}

async fn read_package(path: &Path) -> anyhow::Result<RecordPackage> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read declaration {}", path.display()))?;

    let mut pkg: RecordPackage = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON declaration {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML declaration {}", path.display()))?,
        other => bail!(
            "Unsupported declaration format {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ),
    };
    pkg.reindex_fields();

    debug!(
        path = %path.display(),
        package = %pkg.display_name(),
        backends = ?pkg.backends,
        "Loaded declaration"
    );
    Ok(pkg)
}
