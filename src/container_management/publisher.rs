//! Turns a running container handle into the small configuration result the
//! host application consumes.

use crate::configuration::config::{ConfigResolver, DATABASE_KEY, HOSTS_KEY};
use crate::container_management::types::ContainerHandle;

/// Connection settings derived from a running container.
///
/// Recomputed from the current handle on every invocation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResult {
    /// Address of the managed instance, as `host:port`.
    pub host_address: String,
    /// Database name the application should use.
    pub database_name: String,
}

impl ServiceResult {
    /// Publishes this result into the resolver under the well-known keys, so
    /// downstream consumers read it as ordinary configuration. The values go
    /// into the published layer and are never mistaken for a caller-declared
    /// host override on the next cycle.
    pub fn apply_to(&self, resolver: &mut ConfigResolver) {
        resolver.publish(HOSTS_KEY, self.host_address.clone());
        resolver.publish(DATABASE_KEY, self.database_name.clone());
    }
}

/// Derives the [`ServiceResult`] for a running handle.
///
/// Pure: the mapped port and database name are already known at
/// handle-creation time, so this cannot fail.
pub fn service_result(handle: &ContainerHandle, database_name: &str) -> ServiceResult {
    ServiceResult {
        host_address: format!("localhost:{}", handle.mapped_port),
        database_name: database_name.to_string(),
    }
}
