//! Managed daemons - auxiliary system services shipped as local image archives.
//!
//! A managed daemon is described by a [`ManagedDaemon`] and handled by a
//! [`DaemonManager`], which knows how to bring its image onto the host and how
//! to synthesize the task that runs it.

pub mod installer;

pub use installer::LocalDaemonManager;

use crate::error::Result;
use crate::task::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read-only descriptor of a managed daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedDaemon {
    /// Daemon name, also used as the name of its single container.
    pub name: String,
    pub image_name: String,
    #[serde(default = "default_image_tag")]
    pub image_tag: String,
    /// Path of the packaged `.tar` image archive.
    pub image_tar_path: PathBuf,
}

fn default_image_tag() -> String {
    "latest".to_string()
}

/// Result of loading a daemon image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub image_name: String,
    pub image_tag: String,
    pub install_path: PathBuf,
}

/// Trait for managed daemon handlers.
#[async_trait]
pub trait DaemonManager: Send + Sync {
    /// Image name of the daemon.
    fn image_name(&self) -> &str;

    /// Path of the archive the image is installed from.
    fn image_tar_path(&self) -> &Path;

    /// Whether the daemon image is already present on the host.
    async fn is_loaded(&self) -> Result<bool>;

    /// Install the daemon image if needed, cleaning up after a failed attempt.
    async fn load_image(&self) -> Result<ImageDescriptor>;

    /// Build a fresh managed daemon task for this daemon.
    fn create_daemon_task(&self) -> Result<Task>;
}
