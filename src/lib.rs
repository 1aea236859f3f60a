//! Ephemeral MongoDB dev-service lifecycle management.

pub mod configuration;
pub mod container_management;
pub mod error_handling;

pub use configuration::{Config, ConfigResolver, DevServiceConfig, Topology};
pub use container_management::{
    ContainerHandle, DevServiceManager, DockerLauncher, Launcher, ServiceResult,
};
pub use error_handling::{ConfigError, LaunchError, StopError};
