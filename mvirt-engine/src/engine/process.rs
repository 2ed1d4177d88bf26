//! ProcessEngine - runs managed daemon tasks outside the container backend.
//!
//! Accepting a task installs the daemon image first and then records the task.
//! Spawning and supervising the daemon process are not handled yet, so this
//! engine never emits state change events of its own.

use super::{DataClient, TaskEngine};
use crate::daemon::DaemonManager;
use crate::error::{EngineError, Result};
use crate::task::{StateChangeEvent, Task};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info};

const VERSION: &str = "1.0.0";

/// Task engine for managed daemon tasks.
pub struct ProcessEngine {
    daemon_managers: HashMap<String, Arc<dyn DaemonManager>>,
    /// Held so the event channel stays open for the dispatcher.
    #[allow(dead_code)]
    state_tx: mpsc::Sender<StateChangeEvent>,
    state_rx: Mutex<Option<mpsc::Receiver<StateChangeEvent>>>,
    /// Running tasks by ARN
    running_tasks: RwLock<HashMap<String, Task>>,
    /// Serializes image installs
    install_lock: Mutex<()>,
}

impl ProcessEngine {
    /// Create a process engine for the given daemon managers, keyed by daemon name.
    #[cfg(unix)]
    pub fn new(daemon_managers: HashMap<String, Arc<dyn DaemonManager>>) -> Self {
        let (state_tx, state_rx) = mpsc::channel(1);
        Self {
            daemon_managers,
            state_tx,
            state_rx: Mutex::new(Some(state_rx)),
            running_tasks: RwLock::new(HashMap::new()),
            install_lock: Mutex::new(()),
        }
    }

    #[cfg(not(unix))]
    pub fn new(_daemon_managers: HashMap<String, Arc<dyn DaemonManager>>) -> Self {
        panic!("unsupported OS for process task engine");
    }
}

#[async_trait]
impl TaskEngine for ProcessEngine {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn disable(&self) {
        debug!("ProcessEngine: disabled");
    }

    async fn state_change_events(&self) -> Option<mpsc::Receiver<StateChangeEvent>> {
        self.state_rx.lock().await.take()
    }

    async fn set_data_client(&self, _client: Arc<dyn DataClient>) {}

    /// Accept a managed daemon task.
    ///
    /// # Panics
    ///
    /// Panics if the task is not a managed daemon task. Only the dispatcher
    /// routes tasks here and it filters on the same predicate.
    async fn add_task(&self, task: Task) -> Result<()> {
        if !task.is_managed_daemon() {
            panic!("unsupported task for process engine: {}", task.arn);
        }

        let daemon_name = &task.containers[0].name;
        let manager = self
            .daemon_managers
            .get(daemon_name)
            .ok_or_else(|| EngineError::UnknownDaemon(daemon_name.clone()))?;

        {
            let _guard = self.install_lock.lock().await;
            let image = manager.load_image().await?;
            debug!(
                daemon = %daemon_name,
                path = %image.install_path.display(),
                "Managed daemon image ready"
            );
        }

        info!(arn = %task.arn, daemon = %daemon_name, "ProcessEngine: accepted task");
        self.running_tasks.write().await.insert(task.arn.clone(), task);
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.running_tasks.read().await.values().cloned().collect())
    }

    async fn get_task_by_arn(&self, arn: &str) -> Option<Task> {
        self.running_tasks.read().await.get(arn).cloned()
    }

    async fn version(&self) -> Result<String> {
        Ok(VERSION.to_string())
    }

    async fn load_state(&self) -> Result<()> {
        Ok(())
    }

    async fn save_state(&self) -> Result<()> {
        Ok(())
    }

    async fn marshal_json(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn unmarshal_json(&self, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}
