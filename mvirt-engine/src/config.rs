//! Engine configuration - the managed daemons known to this host.

use crate::daemon::{DaemonManager, LocalDaemonManager, ManagedDaemon};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mvirt/engine.json";

/// Configuration for the task engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub managed_daemons: Vec<ManagedDaemon>,
}

impl Config {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check daemon names are unique and every image archive is a `.tar`.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for daemon in &self.managed_daemons {
            if daemon.name.is_empty() {
                bail!("Managed daemon name must not be empty");
            }
            if !names.insert(daemon.name.as_str()) {
                bail!("Duplicate managed daemon: {}", daemon.name);
            }
            if daemon.image_tar_path.extension().is_none_or(|ext| ext != "tar") {
                bail!(
                    "Image archive of {} must be a .tar file: {}",
                    daemon.name,
                    daemon.image_tar_path.display()
                );
            }
        }
        Ok(())
    }

    pub fn daemon(&self, name: &str) -> Option<&ManagedDaemon> {
        self.managed_daemons.iter().find(|d| d.name == name)
    }

    /// Daemon managers keyed by daemon name.
    pub fn daemon_managers(&self) -> HashMap<String, Arc<dyn DaemonManager>> {
        self.managed_daemons
            .iter()
            .map(|daemon| {
                let manager: Arc<dyn DaemonManager> =
                    Arc::new(LocalDaemonManager::new(daemon.clone()));
                (daemon.name.clone(), manager)
            })
            .collect()
    }
}
