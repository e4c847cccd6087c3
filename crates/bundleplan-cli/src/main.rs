//! bundleplan - build descriptor planner
//!
//! ## Commands
//!
//! - `plan`: resolve flags, stages and provenance into a build descriptor
//! - `budget`: check emitted artifacts against a descriptor's size limits

use anyhow::{Context, Result};
use bundleplan_core::{GitCli, ProjectConfig};
use bundleplan_stages::{BuildDescriptor, BuildPipeline, BuildRequest, SizeBudget};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};

#[derive(Parser)]
#[command(name = "bundleplan")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan library bundle builds: stages, naming and provenance", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce the build descriptor for one invocation
    ///
    /// Build tool arguments go after `--`, e.g. `bundleplan plan -- -p --analyze-bundle`.
    Plan {
        /// Project root: locates the entry files and receives the output
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,

        /// Project config file (default: bundleplan.toml in the workdir, if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the descriptor here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit only the flattened stage list
        #[arg(long)]
        stages_only: bool,

        /// Build tool arguments inspected for build flags
        #[arg(last = true, allow_hyphen_values = true)]
        build_args: Vec<String>,
    },

    /// Check emitted artifacts against a descriptor's size budget
    Budget {
        /// Descriptor JSON produced by `plan`
        #[arg(short, long)]
        descriptor: PathBuf,

        /// Emitted artifact files
        #[arg(required = true)]
        artifacts: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bundleplan_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Plan {
            workdir,
            config,
            output,
            stages_only,
            build_args,
        } => cmd_plan(
            &workdir,
            config.as_deref(),
            output.as_deref(),
            stages_only,
            build_args,
        ),
        Commands::Budget {
            descriptor,
            artifacts,
        } => cmd_budget(&descriptor, &artifacts),
    }
}

fn cmd_plan(
    workdir: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    stages_only: bool,
    build_args: Vec<String>,
) -> Result<()> {
    let workdir = std::fs::canonicalize(workdir)
        .with_context(|| format!("Workdir not found: {}", workdir.display()))?;
    let config =
        ProjectConfig::load(&workdir, config_path).context("Failed to load project config")?;

    let request =
        BuildRequest::new(build_args, process_env(), workdir.clone()).with_config(config);

    let descriptor = BuildPipeline::plan(&request, &GitCli::new(&workdir))
        .context("Failed to plan build")?;

    if stages_only {
        write_json(&descriptor.stage_descriptors(), output)
    } else {
        write_json(&descriptor, output)
    }
}

/// Process environment, skipping variables whose name or value is not UTF-8.
fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                debug!(key = ?key, "skipping non-UTF-8 environment variable");
                None
            }
        })
        .collect()
}

fn cmd_budget(descriptor_path: &Path, artifacts: &[PathBuf]) -> Result<()> {
    let text = std::fs::read_to_string(descriptor_path)
        .with_context(|| format!("Failed to read descriptor: {}", descriptor_path.display()))?;
    let descriptor: BuildDescriptor =
        serde_json::from_str(&text).context("Failed to parse descriptor")?;

    let mut assets = Vec::with_capacity(artifacts.len());
    for path in artifacts {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat artifact: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        assets.push((name, meta.len()));
    }

    let verdict = SizeBudget::evaluate(&descriptor.size_limits, &assets);
    for violation in &verdict.violations {
        if verdict.passed {
            warn!("{violation}");
        }
        println!("  - {violation}");
    }
    println!("{}", verdict.message);

    if !verdict.passed {
        anyhow::bail!("{}", verdict.message);
    }
    info!(assets = assets.len(), "size budget passed");
    Ok(())
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "descriptor written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
