use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum LaunchError {
    RuntimeNotAvailable,
    PortAllocationFailed(std::io::Error),
    RunFailed(String),
    ReadinessTimeout(String),
    ReplicaInitFailed(String),
    IoError(std::io::Error),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::RuntimeNotAvailable => write!(f, "Container runtime not available"),
            LaunchError::PortAllocationFailed(e) => {
                write!(f, "Ephemeral port allocation failed: {}", e)
            }
            LaunchError::RunFailed(e) => write!(f, "Container start failed: {}", e),
            LaunchError::ReadinessTimeout(e) => write!(f, "Readiness wait timed out: {}", e),
            LaunchError::ReplicaInitFailed(e) => {
                write!(f, "Replica set initialization failed: {}", e)
            }
            LaunchError::IoError(e) => write!(f, "Container IO error: {}", e),
        }
    }
}

impl std::error::Error for LaunchError {}

impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StopError {
    StopFailed(String),
    IoError(std::io::Error),
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopError::StopFailed(e) => write!(f, "Container stop failed: {}", e),
            StopError::IoError(e) => write!(f, "Container stop IO error: {}", e),
        }
    }
}

impl std::error::Error for StopError {}

impl From<std::io::Error> for StopError {
    fn from(err: std::io::Error) -> Self {
        StopError::IoError(err)
    }
}
