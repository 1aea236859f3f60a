pub mod config;
pub mod types;

pub use config::{Config, ConfigResolver, DATABASE_KEY, HOSTS_KEY};
pub use types::{DevServiceConfig, Topology};
