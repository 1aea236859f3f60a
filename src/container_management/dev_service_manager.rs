use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::configuration::config::{ConfigResolver, HOSTS_KEY};
use crate::configuration::types::{DevServiceConfig, Topology};
use crate::container_management::launcher::{DockerLauncher, Launcher};
use crate::container_management::publisher::{self, ServiceResult};
use crate::container_management::types::ContainerHandle;
use crate::error_handling::types::{LaunchError, StopError};

/// Owns the lifecycle of the managed MongoDB dev-service container.
///
/// The manager is invoked once per build/reload cycle through [`ensure`].
/// It holds the singleton handle to the running container, decides between
/// start, reuse, and replace, and guarantees the process-exit hook is
/// registered at most once per process lifetime.
///
/// Design notes:
/// - The handle lives in a shared slot (`Arc<Mutex<Option<_>>>`) because the
///   exit-hook task stops the container from a different thread than the one
///   that started it, and a reload-time invocation may come from a fresh
///   execution context.
/// - The hook-registration flag is a one-way latch: a compare-and-swap on an
///   `AtomicBool` flips it on the first successful start only.
/// - No invocation ever returns an error to the caller: a start failure is
///   signaled by the absence of a result, and the caller falls back to
///   externally configured hosts.
///
/// [`ensure`]: DevServiceManager::ensure
#[derive(Clone)]
pub struct DevServiceManager {
    launcher: Arc<dyn Launcher>,
    current: Arc<Mutex<Option<ContainerHandle>>>,
    exit_hook_registered: Arc<AtomicBool>,
}

impl DevServiceManager {
    /// Creates a manager on top of the given launcher.
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        DevServiceManager {
            launcher,
            current: Arc::new(Mutex::new(None)),
            exit_hook_registered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a manager backed by the `docker` CLI.
    ///
    /// Returns an error if no `docker` client is available on the host.
    pub fn with_docker() -> Result<Self, LaunchError> {
        Ok(Self::new(Arc::new(DockerLauncher::new()?)))
    }

    /// Decides, once per cycle, whether a managed MongoDB instance should be
    /// running, and returns the derived connection settings if one is.
    ///
    /// Decision order is fixed: disabled wins, then an explicit host
    /// override, then reuse of a matching running container, then a fresh
    /// start. `None` means "use externally configured settings".
    pub async fn ensure(
        &self,
        config: &DevServiceConfig,
        resolver: &ConfigResolver,
    ) -> Option<ServiceResult> {
        if !config.enabled {
            debug!("Dev service disabled via configuration");
            self.stop_and_log().await;
            return None;
        }

        if let Some(hosts) = resolver.explicit_hosts() {
            debug!(
                "{}={} - using externally configured MongoDB",
                HOSTS_KEY, hosts
            );
            self.stop_and_log().await;
            return None;
        }

        // Reuse the running container across reload cycles, but only when the
        // topology it was started with matches what is currently requested.
        // Starting a fresh mongod on every reload is prohibitively slow.
        if let Some(handle) = self.reusable_handle(config).await {
            debug!("Reusing dev-service container {}", handle.id);
            return Some(publisher::service_result(&handle, &config.database_name));
        }

        self.start_new(config).await
    }

    /// Stops the current container if one is running.
    ///
    /// Idempotent: safe to call with no current handle, with an
    /// already-stopped handle, and from the exit-hook task. The slot is
    /// cleared before the stop is attempted, so no stuck state is observable
    /// even when the stop itself fails. Callers log and discard the error.
    pub async fn stop_if_running(&self) -> Result<(), StopError> {
        let taken = self.slot().take();
        let mut handle = match taken {
            Some(handle) => handle,
            None => return Ok(()),
        };
        if !handle.running {
            return Ok(());
        }
        handle.running = false;

        info!("Stopping MongoDB dev-service container {}", handle.id);
        self.launcher.stop(&handle).await
    }

    /// Returns a copy of the current handle, if any.
    pub fn current_handle(&self) -> Option<ContainerHandle> {
        self.slot().clone()
    }

    /// Whether the process-exit hook has been registered.
    pub fn exit_hook_registered(&self) -> bool {
        self.exit_hook_registered.load(Ordering::Acquire)
    }

    /// Returns the current handle when it is running and matches the
    /// requested topology.
    async fn reusable_handle(&self, config: &DevServiceConfig) -> Option<ContainerHandle> {
        let candidate = self
            .slot()
            .as_ref()
            .filter(|h| h.running && h.topology == config.topology)
            .cloned();

        let handle = candidate?;
        if self.launcher.is_running(&handle).await {
            Some(handle)
        } else {
            debug!("Container {} is no longer running", handle.id);
            None
        }
    }

    /// Starts a fresh container for the requested topology and records it as
    /// current.
    async fn start_new(&self, config: &DevServiceConfig) -> Option<ServiceResult> {
        // The old container must be gone before the replacement starts; two
        // managed instances never run concurrently.
        self.stop_and_log().await;

        let started = match config.topology {
            Topology::Standalone => self.launcher.start_standalone(config).await,
            Topology::ReplicaSet => self.launcher.start_replica_set(config).await,
        };

        let handle = match started {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    "Failed to start MongoDB dev service - falling back to externally \
                     configured hosts (if any). Cause: {}",
                    e
                );
                return None;
            }
        };

        let result = publisher::service_result(&handle, &config.database_name);
        *self.slot() = Some(handle);
        self.register_exit_hook();
        Some(result)
    }

    /// Registers the process-exit hook, at most once per process lifetime.
    ///
    /// Returns whether this call performed the registration.
    pub(crate) fn register_exit_hook(&self) -> bool {
        if self
            .exit_hook_registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let manager = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received - stopping dev-service container");
                    if let Err(e) = manager.stop_if_running().await {
                        warn!("Failed to stop dev-service container on exit: {}", e);
                    }
                }
                Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
            }
        });
        true
    }

    async fn stop_and_log(&self) {
        if let Err(e) = self.stop_if_running().await {
            warn!("Failed to stop dev-service container: {}", e);
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ContainerHandle>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
