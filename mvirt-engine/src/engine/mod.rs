//! Task engines.
//!
//! - **TaskDispatcher**: the engine callers talk to; routes each task to one backend
//! - **ProcessEngine**: runs managed daemon tasks outside the container backend
//!
//! The container backend is an external collaborator that implements
//! [`TaskEngine`] itself.

pub mod dispatcher;
pub mod process;

pub use dispatcher::TaskDispatcher;
pub use process::ProcessEngine;

use crate::error::Result;
use crate::task::{StateChangeEvent, Task};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Persistence handle owned by the container backend.
pub trait DataClient: Send + Sync {
    fn save_task(&self, task: &Task) -> Result<()>;
    fn delete_task(&self, arn: &str) -> Result<()>;
    fn get_tasks(&self) -> Result<Vec<Task>>;
}

/// Capability set shared by every task engine.
#[async_trait]
pub trait TaskEngine: Send + Sync {
    async fn init(&self) -> Result<()>;

    /// Initialize the engine or abort.
    async fn must_init(&self) {
        if let Err(e) = self.init().await {
            panic!("task engine initialization failed: {e}");
        }
    }

    /// Shut the engine down. Must be called at most once.
    async fn disable(&self);

    /// Take the receiving end of the engine's state change channel.
    ///
    /// Returns `None` once the receiver has been handed out.
    async fn state_change_events(&self) -> Option<mpsc::Receiver<StateChangeEvent>>;

    async fn set_data_client(&self, client: Arc<dyn DataClient>);

    async fn add_task(&self, task: Task) -> Result<()>;

    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn get_task_by_arn(&self, arn: &str) -> Option<Task>;

    async fn version(&self) -> Result<String>;

    async fn load_state(&self) -> Result<()>;

    async fn save_state(&self) -> Result<()>;

    /// Serialize the full engine state.
    async fn marshal_json(&self) -> Result<Vec<u8>>;

    /// Restore the full engine state.
    async fn unmarshal_json(&self, data: &[u8]) -> Result<()>;
}
