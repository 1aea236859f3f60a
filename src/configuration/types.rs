use serde::{Deserialize, Serialize};

/// Operating mode of the managed MongoDB instance.
///
/// A single-node replica set enables multi-document transactions, which are
/// not available on a standalone instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    Standalone,
    ReplicaSet,
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Standalone
    }
}

/// Resolved dev-service settings for one build/reload cycle.
///
/// Immutable once resolved; the lifecycle manager only reads it.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DevServiceConfig {
    /// Whether the dev service is enabled. Set to `false` to use an external
    /// MongoDB and suppress container startup.
    pub enabled: bool,
    /// Container image for the MongoDB instance.
    pub image: String,
    /// Database name published alongside the host address when the service
    /// starts.
    pub database_name: String,
    /// Standalone instance or single-node replica set.
    pub topology: Topology,
}

impl Default for DevServiceConfig {
    fn default() -> Self {
        DevServiceConfig {
            enabled: true,
            image: "mongo:8".to_string(),
            database_name: "mongodev".to_string(),
            topology: Topology::Standalone,
        }
    }
}
