//! Task and container model shared by every engine.

use serde::{Deserialize, Serialize};

/// Desired or known status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    None,
    Created,
    Running,
    Stopped,
}

/// Desired or known status of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    #[default]
    None,
    Pulled,
    Created,
    Running,
    Stopped,
}

/// Network mode of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Bridge,
    Host,
    None,
}

/// Kind of container inside a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// Regular user workload.
    #[default]
    Normal,
    /// Placeholder holding an empty host volume.
    EmptyHostVolume,
    /// Pause container used for CNI network setup.
    CniPause,
    /// Pause container holding shared namespaces.
    NamespacePause,
    /// Auxiliary system service executed outside the container backend.
    ManagedDaemon,
}

/// A container belonging to exactly one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(rename = "type")]
    pub container_type: ContainerType,
    pub essential: bool,
    pub desired_status: ContainerStatus,
}

/// A schedulable unit of work identified by its ARN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub arn: String,
    pub desired_status: TaskStatus,
    pub network_mode: NetworkMode,
    pub is_internal: bool,
    pub launch_type: String,
    pub containers: Vec<Container>,
}

impl Task {
    /// Returns true if this task is a single managed daemon container.
    ///
    /// This is the only routing key between the container engine and the
    /// process engine.
    pub fn is_managed_daemon(&self) -> bool {
        matches!(
            self.containers.as_slice(),
            [container] if container.container_type == ContainerType::ManagedDaemon
        )
    }
}

/// Lifecycle notification emitted by an engine.
///
/// Dispatchers relay these without looking inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChangeEvent {
    Task {
        arn: String,
        status: TaskStatus,
        reason: Option<String>,
    },
    Container {
        task_arn: String,
        container_name: String,
        status: ContainerStatus,
        exit_code: Option<i32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(container_type: ContainerType) -> Container {
        Container {
            name: "c".to_string(),
            container_type,
            ..Default::default()
        }
    }

    fn task_with(containers: Vec<Container>) -> Task {
        Task {
            arn: "arn:task".to_string(),
            containers,
            ..Default::default()
        }
    }

    #[test]
    fn single_daemon_container_is_managed_daemon() {
        let task = task_with(vec![container(ContainerType::ManagedDaemon)]);
        assert!(task.is_managed_daemon());
    }

    #[test]
    fn other_shapes_are_not_managed_daemons() {
        assert!(!task_with(vec![]).is_managed_daemon());
        assert!(!task_with(vec![container(ContainerType::Normal)]).is_managed_daemon());
        assert!(
            !task_with(vec![
                container(ContainerType::ManagedDaemon),
                container(ContainerType::ManagedDaemon),
            ])
            .is_managed_daemon()
        );
        assert!(
            !task_with(vec![
                container(ContainerType::ManagedDaemon),
                container(ContainerType::Normal),
            ])
            .is_managed_daemon()
        );
    }

    #[test]
    fn container_type_serializes_as_type() {
        let json = serde_json::to_value(container(ContainerType::ManagedDaemon)).unwrap();
        assert_eq!(json["type"], "managed_daemon");
    }
}
