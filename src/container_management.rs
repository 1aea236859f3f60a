//! Container management subsystem.
//!
//! This module owns the ephemeral MongoDB container used as a dev service:
//! deciding per build/reload cycle whether to start, reuse, or replace it,
//! and stopping it deterministically on process exit. The current
//! implementation targets the `docker` CLI.
//!
//! Re-exports:
//! - [`DevServiceManager`]: main entry point, one `ensure` call per cycle.
//! - [`Launcher`], [`DockerLauncher`]: topology-specific container startup.
//! - [`ContainerHandle`], [`ServiceResult`]: core types.
//!
//! Example (non-running):
//! ```ignore
//! use mongodev::configuration::{Config, DevServiceConfig};
//! use mongodev::container_management::DevServiceManager;
//!
//! // Create a manager (will fail if `docker` is not available)
//! let manager = DevServiceManager::with_docker()?;
//! let mut config = Config::new();
//! if let Some(result) = manager.ensure(&config.devservice, &config.resolver).await {
//!     result.apply_to(&mut config.resolver);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dev_service_manager;
pub mod launcher;
pub mod publisher;
pub mod types;

pub use dev_service_manager::DevServiceManager;
pub use launcher::{DockerLauncher, Launcher, MONGO_PORT};
pub use publisher::{service_result, ServiceResult};
pub use types::ContainerHandle;
