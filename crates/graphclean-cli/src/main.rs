//! graphclean - entity resolution for LLM-extracted knowledge graphs.
//!
//! # Configuration
//!
//! Settings come from `--config` (TOML, JSON or YAML) or, when absent, from
//! `GRAPHCLEAN_*` environment variables. `--fixture` points the run at a
//! JSON graph fixture instead of the configured store.
//!
//! # Usage
//!
//! ```text
//! graphclean --fixture graph.json detect
//! graphclean --fixture graph.json preview --report preview.md
//! graphclean --fixture graph.json apply --output cleaned.json
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use graphclean_core::{render_preview, render_summary, ResolutionConfig, ValidationFixOrchestrator};

mod store;

use store::Backend;

#[derive(Parser)]
#[command(name = "graphclean")]
#[command(about = "Detect and repair duplicate and mistyped entities in a knowledge graph")]
#[command(version)]
struct Cli {
    /// Configuration file (.toml, .json, .yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run against a JSON graph fixture instead of the configured store
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count pending fixes per category without writing anything
    Detect {
        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every pending fix with its relationship impact
    Preview {
        /// Write the markdown report here instead of stdout
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Apply every fix stage in order
    Apply {
        /// Preview only; identical to `preview`
        #[arg(long)]
        dry_run: bool,
        /// Write the markdown summary here instead of stdout
        #[arg(long)]
        report: Option<PathBuf>,
        /// Save the cleaned graph to this fixture path (embedded store only)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let backend = Backend::connect(&config).await?;
    let orchestrator = ValidationFixOrchestrator::new(backend.store(), config.clone());

    match cli.command {
        Commands::Detect { json } => {
            let (_, report) = orchestrator.detect().await?;
            let counts = report.counts();
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("{} pending fixes on {} nodes", counts.total(), report.node_count);
                println!("{}", serde_json::to_string_pretty(&counts)?);
            }
        }
        Commands::Preview { report } => {
            preview(&orchestrator, config.report_limit, report.as_deref()).await?;
        }
        Commands::Apply {
            dry_run: true,
            report,
            ..
        } => {
            preview(&orchestrator, config.report_limit, report.as_deref()).await?;
        }
        Commands::Apply {
            dry_run: false,
            report,
            output,
        } => {
            let token = orchestrator.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after the current stage");
                    token.cancel();
                }
            });

            let summary = orchestrator.apply().await;
            emit(&render_summary(&summary), report.as_deref())?;

            if let Some(path) = output {
                backend.save(&path)?;
            }
            if let Some(reason) = &summary.aborted {
                bail!("fix pass aborted: {}", reason);
            }
            if summary.cancelled {
                bail!("fix pass cancelled");
            }
            if !summary.converged() {
                tracing::warn!(remaining = ?summary.remaining, "Graph did not converge in one pass");
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ResolutionConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolutionConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ResolutionConfig::from_env().context("reading GRAPHCLEAN_* environment")?,
    };
    if let Some(fixture) = &cli.fixture {
        config.store = graphclean_core::GraphStoreConfig::embedded(fixture.display().to_string());
    }
    Ok(config)
}

async fn preview(
    orchestrator: &ValidationFixOrchestrator,
    limit: usize,
    report: Option<&Path>,
) -> Result<()> {
    let preview = orchestrator.preview().await?;
    emit(&render_preview(&preview, limit), report)
}

fn emit(markdown: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, markdown)
                .with_context(|| format!("writing report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
