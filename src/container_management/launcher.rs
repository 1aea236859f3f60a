use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::configuration::types::{DevServiceConfig, Topology};
use crate::container_management::types::ContainerHandle;
use crate::error_handling::types::{LaunchError, StopError};

/// Fixed internal port MongoDB listens on inside the container.
pub const MONGO_PORT: u16 = 27017;

/// Log line emitted by `mongod` once it accepts connections.
pub(crate) const READY_PATTERN: &str = r"[Ww]aiting for connections";

/// Replica set name used for single-node replica set containers.
pub(crate) const REPLICA_SET_NAME: &str = "mongodev-rs";

const READINESS_TIMEOUT: Duration = Duration::from_secs(60);
const PRIMARY_TIMEOUT: Duration = Duration::from_secs(60);

/// Starts, probes, and stops managed MongoDB containers.
///
/// The lifecycle manager holds the launcher behind this trait so the decision
/// logic can be exercised without a container runtime.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Starts a standalone instance and waits until it accepts connections.
    async fn start_standalone(
        &self,
        config: &DevServiceConfig,
    ) -> Result<ContainerHandle, LaunchError>;

    /// Starts a single-node replica set, initializes replication, and waits
    /// until the node reports primary status.
    async fn start_replica_set(
        &self,
        config: &DevServiceConfig,
    ) -> Result<ContainerHandle, LaunchError>;

    /// Probes whether the container behind `handle` is still running.
    async fn is_running(&self, handle: &ContainerHandle) -> bool;

    /// Gracefully stops the container behind `handle`.
    async fn stop(&self, handle: &ContainerHandle) -> Result<(), StopError>;
}

/// [`Launcher`] implementation backed by the `docker` CLI.
pub struct DockerLauncher;

impl DockerLauncher {
    /// Creates a new `DockerLauncher`.
    ///
    /// Returns an error if the `docker` client is not available on the host.
    pub fn new() -> Result<Self, LaunchError> {
        if !Self::is_runtime_available() {
            return Err(LaunchError::RuntimeNotAvailable);
        }
        Ok(DockerLauncher)
    }

    /// Checks whether the `docker` client is available on the system.
    fn is_runtime_available() -> bool {
        let available = std::process::Command::new("docker")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        debug!("docker availability check: {}", available);
        available
    }

    /// Runs the container and waits for the log readiness signal.
    async fn run_container(
        &self,
        config: &DevServiceConfig,
        topology: Topology,
    ) -> Result<ContainerHandle, LaunchError> {
        let name = format!("mongodev-{}", Uuid::new_v4());
        let host_port = allocate_ephemeral_port()?;
        let args = run_args(&name, host_port, &config.image, topology);

        debug!("Spawning container {} with args: {:?}", name, args);
        let output = docker(&args).await?;
        if !output.status.success() {
            return Err(LaunchError::RunFailed(format!(
                "docker run for image '{}': {}",
                config.image,
                stderr_excerpt(&output)
            )));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(LaunchError::RunFailed(
                "docker run reported no container id".to_string(),
            ));
        }

        if let Err(e) = self.await_log_pattern(&id).await {
            self.remove_container(&id).await;
            return Err(e);
        }

        Ok(ContainerHandle {
            id,
            name,
            image: config.image.clone(),
            mapped_port: host_port,
            topology,
            running: true,
            created_at: Utc::now(),
        })
    }

    /// Polls the container logs until [`READY_PATTERN`] appears.
    async fn await_log_pattern(&self, id: &str) -> Result<(), LaunchError> {
        let pattern = Regex::new(READY_PATTERN)
            .map_err(|e| LaunchError::RunFailed(format!("invalid readiness pattern: {}", e)))?;

        let wait = async {
            let mut retries: u64 = 0;
            loop {
                let output = docker(&logs_args(id)).await?;
                // mongod logs to stdout; docker relays earlier lines on stderr
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                if pattern.is_match(&text) {
                    debug!("Container {} reported readiness", id);
                    return Ok(());
                }

                retries += 1;
                let wait_time = std::cmp::min(500 + retries * 200, 3000); // Progressive backoff, cap at 3s
                debug!(
                    "Readiness attempt {} for container {} - retrying in {}ms",
                    retries, id, wait_time
                );
                tokio::time::sleep(Duration::from_millis(wait_time)).await;
            }
        };

        match tokio::time::timeout(READINESS_TIMEOUT, wait).await {
            Ok(result) => result,
            Err(_) => Err(LaunchError::ReadinessTimeout(format!(
                "container {} did not log the readiness pattern within {}s",
                id,
                READINESS_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Initiates single-node replication and waits for primary status.
    async fn init_replica_set(&self, id: &str) -> Result<(), LaunchError> {
        let initiate =
            "try { rs.initiate() } catch (e) { if (e.codeName != 'AlreadyInitialized') throw e }";
        let output = docker(&eval_args(id, initiate)).await?;
        if !output.status.success() {
            return Err(LaunchError::ReplicaInitFailed(format!(
                "rs.initiate() on container {}: {}",
                id,
                stderr_excerpt(&output)
            )));
        }

        let wait = async {
            let mut retries: u64 = 0;
            loop {
                let output = docker(&eval_args(id, "db.hello().isWritablePrimary")).await?;
                if output.status.success()
                    && String::from_utf8_lossy(&output.stdout).trim() == "true"
                {
                    debug!("Container {} reports primary status", id);
                    return Ok(());
                }

                retries += 1;
                let wait_time = std::cmp::min(500 + retries * 200, 3000);
                debug!(
                    "Primary-election attempt {} for container {} - retrying in {}ms",
                    retries, id, wait_time
                );
                tokio::time::sleep(Duration::from_millis(wait_time)).await;
            }
        };

        match tokio::time::timeout(PRIMARY_TIMEOUT, wait).await {
            Ok(result) => result,
            Err(_) => Err(LaunchError::ReadinessTimeout(format!(
                "container {} did not report primary status within {}s",
                id,
                PRIMARY_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Force-removes a container whose startup did not complete.
    async fn remove_container(&self, id: &str) {
        match docker(&["rm".to_string(), "-f".to_string(), id.to_string()]).await {
            Ok(output) if output.status.success() => {
                debug!("Removed partially started container {}", id);
            }
            Ok(output) => {
                warn!(
                    "Failed to remove partially started container {}: {}",
                    id,
                    stderr_excerpt(&output)
                );
            }
            Err(e) => {
                warn!("Failed to remove partially started container {}: {}", id, e);
            }
        }
    }
}

#[async_trait]
impl Launcher for DockerLauncher {
    async fn start_standalone(
        &self,
        config: &DevServiceConfig,
    ) -> Result<ContainerHandle, LaunchError> {
        info!(
            "Starting standalone MongoDB container from image '{}'",
            config.image
        );
        let handle = self.run_container(config, Topology::Standalone).await?;
        info!(
            "MongoDB standalone ready at localhost:{} (container {})",
            handle.mapped_port, handle.id
        );
        Ok(handle)
    }

    async fn start_replica_set(
        &self,
        config: &DevServiceConfig,
    ) -> Result<ContainerHandle, LaunchError> {
        info!(
            "Starting single-node MongoDB replica set from image '{}' (transactions enabled)",
            config.image
        );
        let handle = self.run_container(config, Topology::ReplicaSet).await?;

        if let Err(e) = self.init_replica_set(&handle.id).await {
            self.remove_container(&handle.id).await;
            return Err(e);
        }

        info!(
            "MongoDB replica set ready at localhost:{} (container {})",
            handle.mapped_port, handle.id
        );
        Ok(handle)
    }

    async fn is_running(&self, handle: &ContainerHandle) -> bool {
        let output = match docker(&["inspect".to_string(), handle.id.clone()]).await {
            Ok(output) if output.status.success() => output,
            _ => return false,
        };

        match serde_json::from_slice::<serde_json::Value>(&output.stdout) {
            Ok(inspected) => inspected
                .get(0)
                .and_then(|container| container.pointer("/State/Running"))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            Err(e) => {
                debug!("Failed to parse docker inspect for {}: {}", handle.id, e);
                false
            }
        }
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), StopError> {
        let output = docker(&["stop".to_string(), handle.id.clone()])
            .await
            .map_err(StopError::IoError)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StopError::StopFailed(format!(
                "docker stop {}: {}",
                handle.id,
                stderr_excerpt(&output)
            )))
        }
    }
}

/// Runs the `docker` client with the given arguments and collects its output.
async fn docker(args: &[String]) -> Result<Output, std::io::Error> {
    Command::new("docker").args(args).output().await
}

/// Builds the `docker run` argument list for the requested topology.
fn run_args(name: &str, host_port: u16, image: &str, topology: Topology) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
        "-p".to_string(),
        format!("127.0.0.1:{}:{}", host_port, MONGO_PORT),
        image.to_string(),
    ];

    if topology == Topology::ReplicaSet {
        args.push("--replSet".to_string());
        args.push(REPLICA_SET_NAME.to_string());
        args.push("--bind_ip_all".to_string());
    }

    args
}

fn logs_args(id: &str) -> Vec<String> {
    vec!["logs".to_string(), id.to_string()]
}

/// Builds a `docker exec ... mongosh --eval` argument list.
fn eval_args(id: &str, script: &str) -> Vec<String> {
    vec![
        "exec".to_string(),
        id.to_string(),
        "mongosh".to_string(),
        "--quiet".to_string(),
        "--eval".to_string(),
        script.to_string(),
    ]
}

fn stderr_excerpt(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        format!("exit status {}", output.status)
    } else {
        trimmed.to_string()
    }
}

/// Allocates an ephemeral host port on 127.0.0.1 for the container mapping.
fn allocate_ephemeral_port() -> Result<u16, LaunchError> {
    let listener = std::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .map_err(LaunchError::PortAllocationFailed)?;
    let port = listener
        .local_addr()
        .map_err(LaunchError::PortAllocationFailed)?
        .port();
    // Close the socket to free the port for docker to bind
    drop(listener);
    debug!("Allocated TCP port: {}", port);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_pattern_matches_mongod_log_lines() {
        let pattern = Regex::new(READY_PATTERN).unwrap();

        // mongod 4.x plain-text and 5+/8 structured log formats
        assert!(pattern.is_match("2025-08-01T10:00:00.000+0000 I NETWORK  [initandlisten] waiting for connections on port 27017"));
        assert!(pattern.is_match(
            r#"{"t":{"$date":"2025-08-01T10:00:00.000+00:00"},"s":"I","c":"NETWORK","id":23016,"ctx":"listener","msg":"Waiting for connections","attr":{"port":27017}}"#
        ));

        assert!(!pattern.is_match("shutting down with code:0"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn run_args_standalone_maps_loopback_port() {
        let args = run_args("mongodev-test", 49152, "mongo:8", Topology::Standalone);
        assert_eq!(args[0], "run");
        assert!(args.contains(&"-d".to_string()));
        assert!(args.contains(&"--rm".to_string()));
        assert!(args.contains(&"127.0.0.1:49152:27017".to_string()));
        assert_eq!(args.last(), Some(&"mongo:8".to_string()));
        assert!(!args.contains(&"--replSet".to_string()));
    }

    #[test]
    fn run_args_replica_set_appends_replset_flags() {
        let args = run_args("mongodev-test", 49153, "mongo:8", Topology::ReplicaSet);
        let image_pos = args.iter().position(|a| a == "mongo:8").unwrap();
        let replset_pos = args.iter().position(|a| a == "--replSet").unwrap();

        // mongod flags must come after the image
        assert!(replset_pos > image_pos);
        assert_eq!(args[replset_pos + 1], REPLICA_SET_NAME);
        assert!(args.contains(&"--bind_ip_all".to_string()));
    }

    #[test]
    fn eval_args_build_mongosh_invocation() {
        let args = eval_args("abc123", "rs.initiate()");
        assert_eq!(args[0], "exec");
        assert_eq!(args[1], "abc123");
        assert_eq!(args[2], "mongosh");
        assert_eq!(args.last(), Some(&"rs.initiate()".to_string()));
    }

    #[test]
    fn ephemeral_port_allocation_yields_free_ports() {
        let port1 = allocate_ephemeral_port().unwrap();
        let port2 = allocate_ephemeral_port().unwrap();
        assert!(port1 >= 1024);
        assert!(port2 >= 1024);

        // The freed port must be bindable again
        let listener = std::net::TcpListener::bind(("127.0.0.1", port1));
        assert!(listener.is_ok());
    }

    #[test]
    fn inspect_state_parsing() {
        let payload = r#"[{"Id":"abc","State":{"Status":"running","Running":true}}]"#;
        let value: serde_json::Value = serde_json::from_str(payload).unwrap();
        let running = value
            .get(0)
            .and_then(|c| c.pointer("/State/Running"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        assert!(running);

        let stopped = r#"[{"Id":"abc","State":{"Status":"exited","Running":false}}]"#;
        let value: serde_json::Value = serde_json::from_str(stopped).unwrap();
        let running = value
            .get(0)
            .and_then(|c| c.pointer("/State/Running"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        assert!(!running);
    }
}
