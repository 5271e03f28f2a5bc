//! Registry Codegen CLI
//!
//! Fetches schemas from a schema registry and generates Rust bindings.
//!
//! Usage:
//!   registry-codegen --config registry-codegen.yaml generate
//!   registry-codegen generate --no-fetch --output-dir ./generated
//!   registry-codegen check --format json
//!   registry-codegen validate

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use registry_codegen::registry::{HttpRegistryClient, MemoryRegistry};
use registry_codegen::{drift, pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "registry-codegen")]
#[command(about = "Generate Rust bindings from schema registry subjects")]
struct Cli {
    /// Configuration file, layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch configured subjects and compile every unit
    Generate {
        /// Compile the schemas already on disk without contacting the registry
        #[arg(long)]
        no_fetch: bool,

        /// Override the output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the registry endpoint
        #[arg(short, long)]
        registry: Option<String>,
    },

    /// Report generated files that are out of date
    Check {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Validate the configuration and exit
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = PipelineConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Generate {
            no_fetch,
            output_dir,
            registry,
        } => {
            config.no_fetch |= no_fetch;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(endpoint) = registry {
                config.registry = endpoint;
            }

            pipeline::preflight(&config)?;
            let report = if config.no_fetch {
                // Offline runs never touch the client
                pipeline::run(&config, &MemoryRegistry::new())?
            } else {
                let client = HttpRegistryClient::new(&config.registry)
                    .with_context(|| format!("invalid registry endpoint {:?}", config.registry))?;
                pipeline::run(&config, &client)?
            };

            println!(
                "Fetched {} unit(s), compiled {} unit(s), wrote {} file(s)",
                report.fetched.len(),
                report.compiled.len(),
                report.files_written
            );
            Ok(0)
        }

        Commands::Check { format } => {
            let report = drift::check(&config)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => {
                    for path in &report.missing {
                        println!("missing: {}", path.display());
                    }
                    for path in &report.stale {
                        println!("stale:   {}", path.display());
                    }
                    for change in &report.changed {
                        println!("changed: {} (+{} -{})", change.path.display(), change.lines_added, change.lines_removed);
                        print!("{}", change.diff);
                    }
                }
            }

            if report.has_drift() {
                eprintln!("Generated code is out of date, run `registry-codegen generate`");
                Ok(1)
            } else {
                eprintln!("Generated code is up to date ({} unit(s))", report.units.len());
                Ok(0)
            }
        }

        Commands::Validate => {
            pipeline::preflight(&config)?;
            println!("Configuration is valid: {} schema(s)", config.schemas.len());
            Ok(0)
        }
    }
}
