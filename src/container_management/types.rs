//! Core types used by the container management subsystem.

use crate::configuration::types::Topology;
use chrono::{DateTime, Utc};

/// Handle describing the managed MongoDB container instance.
///
/// At most one handle is "current" at a time; ownership is exclusive to the
/// [`DevServiceManager`](super::DevServiceManager). A handle is never mutated
/// after creation except for `running` transitioning `true -> false` when the
/// container is stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHandle {
    /// Runtime identifier of the container (as reported by `docker run`).
    pub id: String,
    /// Assigned container name (`mongodev-<uuid>`).
    pub name: String,
    /// Image the container was started from.
    pub image: String,
    /// Ephemeral host port mapped to the container's internal MongoDB port.
    pub mapped_port: u16,
    /// Topology the container was started with. Stored at construction time
    /// so the reuse check never has to infer it from the running instance.
    pub topology: Topology,
    /// Whether the manager considers this container running.
    pub running: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
