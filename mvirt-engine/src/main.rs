//! mvirt-engine: managed daemon tooling for the node task engine.
//!
//! Installs, inspects and cleans up managed daemon images on this host, and
//! prints the tasks the engine would submit for them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvirt_engine::config::{Config, DEFAULT_CONFIG_PATH};
use mvirt_engine::{DaemonManager, LocalDaemonManager};

/// mvirt Task Engine
#[derive(Parser, Debug)]
#[command(name = "mvirt-engine", version, about)]
struct Args {
    /// Path to the engine configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List managed daemons and their install state
    List,

    /// Install a managed daemon image
    Install {
        /// Daemon name
        name: String,
    },

    /// Remove the install directory of a managed daemon
    Cleanup {
        /// Daemon name
        name: String,
    },

    /// Print the task that runs a managed daemon
    Task {
        /// Daemon name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mvirt_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    match args.command {
        Commands::List => {
            for daemon in &config.managed_daemons {
                let manager = LocalDaemonManager::new(daemon.clone());
                let state = if manager.is_installed() {
                    "installed"
                } else {
                    "not installed"
                };
                println!(
                    "{}\t{}:{}\t{}\t{}",
                    daemon.name,
                    daemon.image_name,
                    daemon.image_tag,
                    manager.install_dir().display(),
                    state
                );
            }
        }
        Commands::Install { name } => {
            let manager = manager_for(&config, &name)?;
            let image = manager
                .load_image()
                .await
                .with_context(|| format!("Failed to install managed daemon {name}"))?;
            info!(
                "Installed {}:{} at {}",
                image.image_name,
                image.image_tag,
                image.install_path.display()
            );
        }
        Commands::Cleanup { name } => {
            let manager = manager_for(&config, &name)?;
            manager.cleanup_install_dir();
            info!("Cleaned up {}", manager.install_dir().display());
        }
        Commands::Task { name } => {
            let manager = manager_for(&config, &name)?;
            let task = manager.create_daemon_task()?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
    }

    Ok(())
}

/// Load the config file. A missing file at the default path means no daemons.
fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
        info!("No config at {}, no managed daemons configured", path.display());
        return Ok(Config::default());
    }
    Config::load(path)
}

fn manager_for(config: &Config, name: &str) -> Result<LocalDaemonManager> {
    let daemon = config
        .daemon(name)
        .with_context(|| format!("Unknown managed daemon: {name}"))?;
    Ok(LocalDaemonManager::new(daemon.clone()))
}
