//! isofitts: ISO 9241-9 multi-directional pointing test for classifier-driven
//! cursors, with offline throughput/efficiency analysis.

mod analyze;
mod cli;
mod config;
mod run;

use anyhow::bail;
use cli::{Cli, Commands, ConfigAction};
use config::AppConfig;
use run::RunOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            source,
            bind,
            label,
            seed,
            output,
        } => {
            let options = RunOptions {
                source,
                bind,
                label,
                seed,
                output,
            };
            run_command(&load_config(cli.config.as_deref())?, &options)?;
        }
        Commands::Analyze { dir, report } => {
            let config = load_config(cli.config.as_deref())?;
            analyze::run_analyze(&dir, report.as_deref(), &config)?;
        }
        Commands::Config { action } => {
            config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_default(),
    }
}

fn run_command(config: &AppConfig, options: &RunOptions) -> anyhow::Result<()> {
    let abort = Arc::new(AtomicBool::new(false));
    let abort_handler = abort.clone();
    ctrlc::set_handler(move || {
        abort_handler.store(true, Ordering::SeqCst);
    })?;

    let outcome = run::run_session(config, options, &abort)?;
    println!(
        "{} ({:?}, {} ticks, {} trials)",
        outcome.saved_to.display(),
        outcome.log.status(),
        outcome.summary.ticks,
        outcome.metrics.trials.len()
    );
    if abort.load(Ordering::SeqCst) {
        info!("run interrupted, partial log kept");
    }
    Ok(())
}

fn config_command(action: ConfigAction, path: Option<&Path>) -> anyhow::Result<()> {
    let target = path.map_or_else(AppConfig::default_path, Path::to_path_buf);
    match action {
        ConfigAction::Show => {
            let config = load_config(path)?;
            println!("# {}", target.display());
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if target.exists() && !force {
                bail!(
                    "config already exists at {}; use --force to overwrite",
                    target.display()
                );
            }
            AppConfig::default().save(&target)?;
            println!("wrote default configuration to {}", target.display());
        }
    }
    Ok(())
}
