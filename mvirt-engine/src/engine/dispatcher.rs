//! TaskDispatcher - one task engine over the container and process engines.
//!
//! Managed daemon tasks go to the process engine, everything else goes to
//! the container engine. State change events of both engines are relayed
//! onto a single outward channel by one background task until `disable()`.

use super::{DataClient, TaskEngine};
use crate::error::{EngineError, Result};
use crate::task::{StateChangeEvent, Task};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Task engine that routes tasks between two backends.
pub struct TaskDispatcher {
    container_engine: Arc<dyn TaskEngine>,
    process_engine: Arc<dyn TaskEngine>,
    events_rx: Mutex<Option<mpsc::Receiver<StateChangeEvent>>>,
    /// Fires once to stop the relay. Taken by the first `disable()`.
    done_tx: Mutex<Option<oneshot::Sender<()>>>,
    relay: Mutex<Option<JoinHandle<()>>>,
}

impl TaskDispatcher {
    /// Create a dispatcher and start relaying events of both engines.
    ///
    /// Must be called from within a tokio runtime. Fails if either engine has
    /// already handed out its state change receiver.
    pub async fn new(
        container_engine: Arc<dyn TaskEngine>,
        process_engine: Arc<dyn TaskEngine>,
    ) -> Result<Self> {
        let container_events = container_engine
            .state_change_events()
            .await
            .ok_or(EngineError::EventsTaken("container"))?;
        let process_events = process_engine
            .state_change_events()
            .await
            .ok_or(EngineError::EventsTaken("process"))?;

        let (events_tx, events_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();
        let relay = tokio::spawn(relay_events(
            container_events,
            process_events,
            events_tx,
            done_rx,
        ));

        Ok(Self {
            container_engine,
            process_engine,
            events_rx: Mutex::new(Some(events_rx)),
            done_tx: Mutex::new(Some(done_tx)),
            relay: Mutex::new(Some(relay)),
        })
    }

    fn engine_for(&self, task: &Task) -> &Arc<dyn TaskEngine> {
        if task.is_managed_daemon() {
            &self.process_engine
        } else {
            &self.container_engine
        }
    }
}

/// Forward events of both engines until `done` fires.
///
/// Neither source is preferred. A pending forward is abandoned as soon as
/// `done` fires, so a caller that stopped reading cannot keep the relay alive.
async fn relay_events(
    mut container_events: mpsc::Receiver<StateChangeEvent>,
    mut process_events: mpsc::Receiver<StateChangeEvent>,
    events_tx: mpsc::Sender<StateChangeEvent>,
    mut done: oneshot::Receiver<()>,
) {
    debug!("TaskDispatcher: event relay running");

    loop {
        let event = tokio::select! {
            Some(event) = container_events.recv() => event,
            Some(event) = process_events.recv() => event,
            _ = &mut done => break,
        };

        tokio::select! {
            sent = events_tx.send(event) => {
                if sent.is_err() {
                    debug!("TaskDispatcher: no event listener, dropping event");
                }
            }
            _ = &mut done => break,
        }
    }

    debug!("TaskDispatcher: event relay stopped");
}

#[async_trait]
impl TaskEngine for TaskDispatcher {
    async fn init(&self) -> Result<()> {
        self.container_engine.init().await?;
        self.process_engine.init().await
    }

    async fn must_init(&self) {
        self.container_engine.must_init().await;
        self.process_engine.must_init().await;
    }

    /// Disable both engines, then stop the relay and wait for it to exit.
    async fn disable(&self) {
        let Some(done_tx) = self.done_tx.lock().await.take() else {
            warn!("TaskDispatcher: disable called more than once");
            return;
        };

        self.container_engine.disable().await;
        self.process_engine.disable().await;
        let _ = done_tx.send(());

        if let Some(relay) = self.relay.lock().await.take() {
            if let Err(e) = relay.await {
                error!("TaskDispatcher: event relay failed: {e}");
            }
        }
        info!("TaskDispatcher: disabled");
    }

    async fn state_change_events(&self) -> Option<mpsc::Receiver<StateChangeEvent>> {
        self.events_rx.lock().await.take()
    }

    async fn set_data_client(&self, client: Arc<dyn DataClient>) {
        self.container_engine.set_data_client(client).await;
    }

    async fn add_task(&self, task: Task) -> Result<()> {
        self.engine_for(&task).add_task(task).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.container_engine.list_tasks().await?;
        tasks.extend(self.process_engine.list_tasks().await?);
        Ok(tasks)
    }

    async fn get_task_by_arn(&self, arn: &str) -> Option<Task> {
        match self.container_engine.get_task_by_arn(arn).await {
            Some(task) => Some(task),
            None => self.process_engine.get_task_by_arn(arn).await,
        }
    }

    /// Version of the container engine. The process engine is an internal detail.
    async fn version(&self) -> Result<String> {
        self.container_engine.version().await
    }

    async fn load_state(&self) -> Result<()> {
        self.container_engine.load_state().await
    }

    async fn save_state(&self) -> Result<()> {
        self.container_engine.save_state().await
    }

    async fn marshal_json(&self) -> Result<Vec<u8>> {
        self.container_engine.marshal_json().await
    }

    async fn unmarshal_json(&self, data: &[u8]) -> Result<()> {
        self.container_engine.unmarshal_json(data).await
    }
}
