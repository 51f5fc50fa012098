// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use modstack::updater::{ComponentOutcome, StdinPrompt, Updater};
use modstack::{HttpTransport, UpdaterConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "modstack")]
#[command(author, version, about = "Incremental updater for layered game and mod installations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the installation against remote versions and apply patches
    Update {
        /// Manifest path (default: updater.yaml under the destination)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Installation directory to patch
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
        /// Suppress download progress bars
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show tracked components and their recorded versions
    Status {
        /// Manifest path
        #[arg(short, long, default_value = "updater.yaml")]
        config: PathBuf,
    },
}

fn run_update(config_path: Option<PathBuf>, dest: PathBuf, quiet: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| dest.join("updater.yaml"));

    let mut config = UpdaterConfig::load(&config_path)?;
    info!(
        "reconciling {} components against {}",
        config.components.len(),
        dest.display()
    );

    let transport = HttpTransport::new()?;
    let prompt = StdinPrompt;
    let updater = Updater::new(&transport, &prompt, &dest).with_progress(!quiet);

    let reports = updater.run(&mut config)?;

    // Persist the updated versions and passwords only after a clean run
    config.save(&config_path)?;

    for report in &reports {
        match report.outcome {
            ComponentOutcome::Skipped => println!("  {:<30} up to date", report.name),
            ComponentOutcome::Applied(stats) => println!(
                "  {:<30} applied ({} files written, {} unchanged)",
                report.name, stats.written, stats.skipped
            ),
        }
    }

    let applied = reports
        .iter()
        .filter(|r| matches!(r.outcome, ComponentOutcome::Applied(_)))
        .count();
    println!("{} of {} components updated", applied, reports.len());

    Ok(())
}

fn run_status(config_path: PathBuf) -> Result<()> {
    let config = UpdaterConfig::load(&config_path)?;

    for component in &config.components {
        let version = match &component.version {
            Some(v) => v.as_str(),
            None if component.has_version_tracking() => "(never applied)",
            None => "(untracked, always reapplied)",
        };
        println!("  {:<30} {}", component.name, version);
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Update {
            config,
            dest,
            quiet,
        }) => run_update(config, dest, quiet),
        Some(Commands::Status { config }) => run_status(config),
        None => run_update(None, PathBuf::from("."), false),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
