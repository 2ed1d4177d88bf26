//! Test helpers for mvirt-engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use mvirt_engine::task::{Container, ContainerType, StateChangeEvent, TaskStatus};
use mvirt_engine::{DataClient, EngineError, Result, Task, TaskEngine};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// In-memory engine that records every call it receives.
pub struct MockEngine {
    name: &'static str,
    version: &'static str,
    events_tx: mpsc::Sender<StateChangeEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<StateChangeEvent>>>,
    tasks: Mutex<Vec<Task>>,
    calls: Arc<Mutex<Vec<String>>>,
    pub fail_init: AtomicBool,
    pub fail_list: AtomicBool,
}

impl MockEngine {
    pub fn new(name: &'static str, version: &'static str) -> Self {
        Self::with_log(name, version, Arc::new(Mutex::new(Vec::new())))
    }

    /// Create a mock that appends its calls to a shared log.
    pub fn with_log(
        name: &'static str,
        version: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1);
        Self {
            name,
            version,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            tasks: Mutex::new(Vec::new()),
            calls,
            fail_init: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
        }
    }

    /// Sender the mock publishes its state changes on.
    pub fn events(&self) -> mpsc::Sender<StateChangeEvent> {
        self.events_tx.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: &str) {
        self.calls.lock().await.push(format!("{}.{}", self.name, call));
    }
}

#[async_trait]
impl TaskEngine for MockEngine {
    async fn init(&self) -> Result<()> {
        self.record("init").await;
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(EngineError::Backend(format!("{} init failed", self.name)));
        }
        Ok(())
    }

    async fn disable(&self) {
        self.record("disable").await;
    }

    async fn state_change_events(&self) -> Option<mpsc::Receiver<StateChangeEvent>> {
        self.events_rx.lock().await.take()
    }

    async fn set_data_client(&self, _client: Arc<dyn DataClient>) {
        self.record("set_data_client").await;
    }

    async fn add_task(&self, task: Task) -> Result<()> {
        self.record("add_task").await;
        self.tasks.lock().await.push(task);
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(EngineError::Backend(format!("{} list failed", self.name)));
        }
        Ok(self.tasks.lock().await.clone())
    }

    async fn get_task_by_arn(&self, arn: &str) -> Option<Task> {
        self.record("get_task_by_arn").await;
        self.tasks.lock().await.iter().find(|t| t.arn == arn).cloned()
    }

    async fn version(&self) -> Result<String> {
        Ok(self.version.to_string())
    }

    async fn load_state(&self) -> Result<()> {
        self.record("load_state").await;
        Ok(())
    }

    async fn save_state(&self) -> Result<()> {
        self.record("save_state").await;
        Ok(())
    }

    async fn marshal_json(&self) -> Result<Vec<u8>> {
        self.record("marshal_json").await;
        Ok(format!("{{\"engine\":\"{}\"}}", self.name).into_bytes())
    }

    async fn unmarshal_json(&self, _data: &[u8]) -> Result<()> {
        self.record("unmarshal_json").await;
        Ok(())
    }
}

/// Data client that stores nothing.
pub struct NoopDataClient;

impl DataClient for NoopDataClient {
    fn save_task(&self, _task: &Task) -> Result<()> {
        Ok(())
    }

    fn delete_task(&self, _arn: &str) -> Result<()> {
        Ok(())
    }

    fn get_tasks(&self) -> Result<Vec<Task>> {
        Ok(Vec::new())
    }
}

pub fn container_task(arn: &str, containers: usize) -> Task {
    Task {
        arn: arn.to_string(),
        desired_status: TaskStatus::Running,
        containers: (0..containers)
            .map(|i| Container {
                name: format!("app-{i}"),
                essential: true,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

pub fn daemon_task(arn: &str, daemon: &str) -> Task {
    Task {
        arn: arn.to_string(),
        desired_status: TaskStatus::Running,
        is_internal: true,
        containers: vec![Container {
            name: daemon.to_string(),
            container_type: ContainerType::ManagedDaemon,
            essential: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn task_event(arn: &str, status: TaskStatus) -> StateChangeEvent {
    StateChangeEvent::Task {
        arn: arn.to_string(),
        status,
        reason: None,
    }
}
