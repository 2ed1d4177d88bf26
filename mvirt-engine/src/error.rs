//! Error types for mvirt-engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while installing a managed daemon image onto disk.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to open managed daemon archive {path}: {source}")]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read managed daemon archive: {0}")]
    ReadArchive(#[source] io::Error),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy archive contents to {path}: {source}")]
    CopyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive entry {path} has unsupported type {entry_type:?}")]
    UnsupportedEntryType {
        path: PathBuf,
        entry_type: tar::EntryType,
    },

    #[error("archive entry {0} escapes the install directory")]
    UnsafeEntryPath(PathBuf),

    #[error("failed to write install marker {path}: {source}")]
    WriteMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("install task aborted: {0}")]
    Aborted(String),
}

/// Task engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("no managed daemon registered for {0}")]
    UnknownDaemon(String),

    #[error("state change events of the {0} engine were already taken")]
    EventsTaken(&'static str),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
