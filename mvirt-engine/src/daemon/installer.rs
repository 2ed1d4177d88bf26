//! LocalDaemonManager - installs managed daemon images from local archives.
//!
//! The archive at `<dir>/<daemon>.tar` is extracted into `<dir>/<daemon>`.
//! An empty `installed.marker` file is written into the install directory
//! once every entry has been extracted; its presence is the only thing that
//! counts as "installed". Nothing here cleans up after a failed extraction,
//! callers do that with [`LocalDaemonManager::cleanup_install_dir`].

use super::{DaemonManager, ImageDescriptor, ManagedDaemon};
use crate::error::{InstallError, Result};
use crate::task::{Container, ContainerStatus, ContainerType, NetworkMode, Task, TaskStatus};
use async_trait::async_trait;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the sentinel file marking a completed install.
pub const INSTALL_MARKER: &str = "installed.marker";

const ARCHIVE_EXTENSION: &str = "tar";

/// Mode for directories created during extraction.
const DIR_MODE: u32 = 0o755;

/// Daemon manager backed by a local image archive.
#[derive(Debug, Clone)]
pub struct LocalDaemonManager {
    daemon: ManagedDaemon,
    install_dir: PathBuf,
}

impl LocalDaemonManager {
    pub fn new(daemon: ManagedDaemon) -> Self {
        let install_dir = install_dir_for(&daemon.image_tar_path);
        Self {
            daemon,
            install_dir,
        }
    }

    /// Directory the archive is extracted into.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn marker_path(&self) -> PathBuf {
        self.install_dir.join(INSTALL_MARKER)
    }

    /// Returns true if the install marker exists and is a regular file.
    ///
    /// A marker that cannot be stat'ed for any reason, including permission
    /// errors, reads as "not installed".
    pub fn is_installed(&self) -> bool {
        match fs::metadata(self.marker_path()) {
            Ok(metadata) => metadata.is_file(),
            Err(e) => {
                debug!(daemon = %self.daemon.name, error = %e, "Install marker not readable");
                false
            }
        }
    }

    /// Extract the archive unless the install marker is already present.
    ///
    /// On failure the install directory is left as it is.
    pub fn ensure_installed(&self) -> std::result::Result<(), InstallError> {
        if self.is_installed() {
            debug!(daemon = %self.daemon.name, "Managed daemon already installed");
            return Ok(());
        }

        info!(
            daemon = %self.daemon.name,
            archive = %self.daemon.image_tar_path.display(),
            target = %self.install_dir.display(),
            "Installing managed daemon"
        );
        self.extract_archive()?;
        info!(daemon = %self.daemon.name, "Managed daemon installed");
        Ok(())
    }

    /// Remove the install directory. Failures are logged and swallowed.
    pub fn cleanup_install_dir(&self) {
        match fs::remove_dir_all(&self.install_dir) {
            Ok(()) => debug!(path = %self.install_dir.display(), "Removed install directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.install_dir.display(),
                error = %e,
                "Failed to clean up managed daemon install directory"
            ),
        }
    }

    fn extract_archive(&self) -> std::result::Result<(), InstallError> {
        let tar_path = &self.daemon.image_tar_path;
        let file = File::open(tar_path).map_err(|source| {
            warn!(
                daemon = %self.daemon.image_name,
                path = %tar_path.display(),
                error = %source,
                "Managed daemon image archive unavailable"
            );
            InstallError::OpenArchive {
                path: tar_path.clone(),
                source,
            }
        })?;

        create_dir(&self.install_dir).map_err(|source| InstallError::CreateDir {
            path: self.install_dir.clone(),
            source,
        })?;

        let mut archive = Archive::new(file);
        let entries = archive.entries().map_err(InstallError::ReadArchive)?;

        for entry in entries {
            let mut entry = entry.map_err(InstallError::ReadArchive)?;
            let entry_path = entry.path().map_err(InstallError::ReadArchive)?.into_owned();
            let target = self.entry_target(&entry_path)?;

            match entry.header().entry_type() {
                EntryType::Directory => {
                    if !target.exists() {
                        create_dir(&target).map_err(|source| InstallError::CreateDir {
                            path: target.clone(),
                            source,
                        })?;
                    }
                }
                EntryType::Regular => {
                    let mode = entry.header().mode().map_err(InstallError::ReadArchive)?;
                    let mut out =
                        create_file(&target, mode).map_err(|source| InstallError::CreateFile {
                            path: target.clone(),
                            source,
                        })?;
                    let size = entry.size();
                    // Close before checking the copy so no descriptor outlives this entry.
                    let copied = io::copy(&mut entry, &mut out).and_then(|n| {
                        if n < size {
                            return Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                format!("archive entry truncated after {n} of {size} bytes"),
                            ));
                        }
                        Ok(n)
                    });
                    drop(out);
                    copied.map_err(|source| InstallError::CopyFile {
                        path: target.clone(),
                        source,
                    })?;
                }
                entry_type => {
                    return Err(InstallError::UnsupportedEntryType {
                        path: entry_path,
                        entry_type,
                    });
                }
            }
        }

        let marker = self.marker_path();
        File::create(&marker).map_err(|source| InstallError::WriteMarker {
            path: marker,
            source,
        })?;
        Ok(())
    }

    /// Resolve an archive entry below the install directory.
    ///
    /// Absolute paths and `..` segments are rejected.
    fn entry_target(&self, entry_path: &Path) -> std::result::Result<PathBuf, InstallError> {
        let escapes = entry_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(InstallError::UnsafeEntryPath(entry_path.to_path_buf()));
        }
        Ok(self.install_dir.join(entry_path))
    }

    fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor {
            image_name: self.daemon.image_name.clone(),
            image_tag: self.daemon.image_tag.clone(),
            install_path: self.install_dir.clone(),
        }
    }
}

#[async_trait]
impl DaemonManager for LocalDaemonManager {
    fn image_name(&self) -> &str {
        &self.daemon.image_name
    }

    fn image_tar_path(&self) -> &Path {
        &self.daemon.image_tar_path
    }

    async fn is_loaded(&self) -> Result<bool> {
        Ok(self.is_installed())
    }

    async fn load_image(&self) -> Result<ImageDescriptor> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || {
            manager.ensure_installed().inspect_err(|_| {
                manager.cleanup_install_dir();
            })
        })
        .await
        .map_err(|e| InstallError::Aborted(e.to_string()))??;

        Ok(self.descriptor())
    }

    fn create_daemon_task(&self) -> Result<Task> {
        Ok(Task {
            arn: format!("arn:::::/{}-{}", self.daemon.image_name, Uuid::new_v4()),
            desired_status: TaskStatus::Running,
            network_mode: NetworkMode::Host,
            is_internal: true,
            launch_type: "EC2".to_string(),
            containers: vec![Container {
                name: self.daemon.name.clone(),
                container_type: ContainerType::ManagedDaemon,
                essential: true,
                desired_status: ContainerStatus::Running,
            }],
        })
    }
}

/// Install directory for an archive: the archive path without its `.tar`
/// extension. Archives with another extension get a `.d` directory instead
/// so the directory never collides with the archive itself.
pub fn install_dir_for(tar_path: &Path) -> PathBuf {
    match tar_path.extension() {
        Some(ext) if ext == ARCHIVE_EXTENSION => tar_path.with_extension(""),
        _ => tar_path.with_extension("d"),
    }
}

#[cfg(unix)]
fn create_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(DIR_MODE).create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path) -> io::Result<()> {
    DirBuilder::new().recursive(true).create(path)
}

#[cfg(unix)]
fn create_file(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn create_file(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}
