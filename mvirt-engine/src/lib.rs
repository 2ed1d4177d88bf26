//! mvirt-engine - node-local task engine.
//!
//! Decides how a task is executed on a host and installs managed daemons.
//!
//! ## Architecture
//!
//! - **TaskDispatcher**: public task engine, routes tasks and merges events
//! - **ProcessEngine**: accepts managed daemon tasks and installs their images
//! - **LocalDaemonManager**: extracts daemon image archives onto local disk
//!
//! The container backend is supplied by the caller as any [`TaskEngine`].

pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod task;

pub use config::Config;
pub use daemon::{DaemonManager, LocalDaemonManager, ManagedDaemon};
pub use engine::{DataClient, ProcessEngine, TaskDispatcher, TaskEngine};
pub use error::{EngineError, InstallError, Result};
pub use task::{StateChangeEvent, Task};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Build the task engine callers use: the given container engine plus a
/// process engine for the given managed daemons.
pub async fn new_task_engine(
    container_engine: Arc<dyn TaskEngine>,
    daemon_managers: HashMap<String, Arc<dyn DaemonManager>>,
) -> Result<TaskDispatcher> {
    info!(
        "Initializing task engine with {} managed daemons",
        daemon_managers.len()
    );
    let process_engine = Arc::new(ProcessEngine::new(daemon_managers));
    TaskDispatcher::new(container_engine, process_engine).await
}
