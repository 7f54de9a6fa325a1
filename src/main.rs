//! Demo for scoped log levels.
//!
//! `scopelog init` writes a starter config, `scopelog run` logs from two
//! modules at every level while watching that config. Edit the file while
//! `run` is active to see levels change without a restart.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use scopelog::{Config, HandlerOptions, ScopeError, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "scopelog")]
#[command(about = "Scoped, hot-reloadable log levels for tracing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config with every module at ERROR
    Init {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Module to list (repeatable). Defaults to the demo modules.
        #[arg(short, long = "module")]
        modules: Vec<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Log from the demo modules, reloading the config file on change
    Run {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Show internal diagnostics
        #[arg(long)]
        debug: bool,
    },
}

mod db {
    pub fn tick(n: u64) {
        tracing::debug!(n, "db: debug");
        tracing::info!(n, "db: info");
        tracing::warn!(n, "db: warn");
        tracing::error!(n, "db: error");
    }
}

mod http {
    pub fn tick(n: u64) {
        tracing::debug!(n, "http: debug");
        tracing::info!(n, "http: info");
        tracing::warn!(n, "http: warn");
        tracing::error!(n, "http: error");
    }
}

#[tokio::main]
async fn main() -> Result<(), ScopeError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            file,
            modules,
            force,
        } => {
            if file.exists() && !force {
                eprintln!("{} already exists, use --force to overwrite", file.display());
                return Ok(());
            }
            let modules = if modules.is_empty() {
                vec![
                    concat!(module_path!(), "::db").to_string(),
                    concat!(module_path!(), "::http").to_string(),
                ]
            } else {
                modules
            };
            Config::template(modules).save(&file)?;
            println!("wrote {}", file.display());
        }
        Commands::Run {
            file,
            interval_ms,
            debug,
        } => {
            let handler = scopelog::try_init(HandlerOptions {
                enable_file_watcher: true,
                config_file: Some(file.clone()),
                config: None,
                debug,
            })?;

            tracing::info!(
                file = %file.display(),
                watching = handler.is_watching(),
                "scopelog demo starting"
            );

            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            let mut n = 0u64;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        db::tick(n);
                        http::tick(n);
                        n += 1;
                    }
                    res = tokio::signal::ctrl_c() => {
                        res?;
                        break;
                    }
                }
            }

            handler.close();
            tracing::info!("shutdown complete");
        }
    }

    Ok(())
}
