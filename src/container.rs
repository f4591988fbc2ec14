//! Container lifecycle management for one scan cycle.
//!
//! A [`ContainerHandle`] is exclusively owned by the file cycle (or shared
//! exec job) that created it. State moves `Created -> Running ->
//! LogsAttached -> Removed`; `Failed` is terminal and reachable from any
//! non-terminal state. Removal is the only cleanup path and must be attempted
//! on every exit path, so [`Lifecycle::remove`] is idempotent and forced.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    errors::ScanError,
    runtime::{ContainerConfig, ContainerId, ContainerRuntime, LogStream},
};

/// Fixed inspection interval for readiness polling.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    LogsAttached,
    Removed,
    Failed,
}

/// One running or terminated analysis container.
#[derive(Debug)]
pub struct ContainerHandle {
    id: ContainerId,
    image: String,
    state: LifecycleState,
}

impl ContainerHandle {
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }
}

/// Drives create/start/readiness/remove against an injected runtime.
pub struct Lifecycle {
    runtime: Arc<dyn ContainerRuntime>,
    startup_timeout: Duration,
}

impl Lifecycle {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, startup_timeout: Duration) -> Self {
        Lifecycle { runtime, startup_timeout }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub async fn create(&self, config: &ContainerConfig) -> Result<ContainerHandle, ScanError> {
        let id = self.runtime.create(config).await?;
        debug!("Created container {id} from {}", config.image);
        Ok(ContainerHandle { id, image: config.image.clone(), state: LifecycleState::Created })
    }

    pub async fn start(&self, handle: &mut ContainerHandle) -> Result<(), ScanError> {
        match self.runtime.start(&handle.id).await {
            Ok(()) => {
                handle.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                handle.state = LifecycleState::Failed;
                Err(e)
            }
        }
    }

    /// Polls the engine at a fixed interval until it reports the container
    /// running, bounded by the configured startup timeout. Long-lived
    /// containers need this before the first exec session; ephemeral ones
    /// skip it because attaching logs is already synchronized on the stream.
    pub async fn wait_until_running(
        &self,
        handle: &mut ContainerHandle,
        cancel: &CancellationToken,
    ) -> Result<(), ScanError> {
        let mut waited = Duration::ZERO;
        loop {
            match self.runtime.is_running(&handle.id).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    handle.state = LifecycleState::Failed;
                    return Err(e);
                }
            }
            if waited >= self.startup_timeout {
                handle.state = LifecycleState::Failed;
                return Err(ScanError::StartupTimeout {
                    container: handle.id.to_string(),
                    waited,
                });
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    handle.state = LifecycleState::Failed;
                    return Err(ScanError::Cancelled);
                }
                _ = sleep(POLL_INTERVAL) => waited += POLL_INTERVAL,
            }
        }
    }

    /// Attaches the followed log stream. Valid only once the container is
    /// running; calling it from another state is a programming error.
    pub async fn attach_logs(&self, handle: &mut ContainerHandle) -> Result<LogStream, ScanError> {
        debug_assert_eq!(handle.state, LifecycleState::Running);
        match self.runtime.attach_logs(&handle.id).await {
            Ok(stream) => {
                handle.state = LifecycleState::LogsAttached;
                Ok(stream)
            }
            Err(e) => {
                handle.state = LifecycleState::Failed;
                Err(e)
            }
        }
    }

    /// Force-removes the container. Idempotent across repeated calls and safe
    /// from any state, including `Failed`.
    pub async fn remove(&self, handle: &mut ContainerHandle) -> Result<(), ScanError> {
        if handle.state == LifecycleState::Removed {
            return Ok(());
        }
        match self.runtime.remove(&handle.id).await {
            Ok(()) => {
                debug!("Removed container {} ({})", handle.id, handle.image);
                handle.state = LifecycleState::Removed;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove container {}: {e}", handle.id);
                handle.state = LifecycleState::Failed;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::stream;

    use super::*;

    /// Engine stub whose containers never report running.
    struct NeverRunning {
        inspects: AtomicUsize,
    }

    #[async_trait]
    impl ContainerRuntime for NeverRunning {
        async fn create(&self, _config: &ContainerConfig) -> Result<ContainerId, ScanError> {
            Ok(ContainerId("stalled".into()))
        }

        async fn start(&self, _id: &ContainerId) -> Result<(), ScanError> {
            Ok(())
        }

        async fn is_running(&self, _id: &ContainerId) -> Result<bool, ScanError> {
            self.inspects.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn attach_logs(&self, _id: &ContainerId) -> Result<LogStream, ScanError> {
            Ok(Box::pin(stream::empty()))
        }

        async fn exec(
            &self,
            _id: &ContainerId,
            _command: &[String],
        ) -> Result<LogStream, ScanError> {
            Ok(Box::pin(stream::empty()))
        }

        async fn remove(&self, _id: &ContainerId) -> Result<(), ScanError> {
            Ok(())
        }
    }

    fn test_config() -> ContainerConfig {
        ContainerConfig {
            image: "trailofbits/eth-security-toolbox".into(),
            command: Vec::new(),
            bind_host_dir: "/tmp/contracts".into(),
            tty: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_poll_is_bounded() {
        let runtime = Arc::new(NeverRunning { inspects: AtomicUsize::new(0) });
        let lifecycle = Lifecycle::new(runtime.clone(), Duration::from_secs(3));
        let mut handle = lifecycle.create(&test_config()).await.unwrap();
        lifecycle.start(&mut handle).await.unwrap();

        let err = lifecycle
            .wait_until_running(&mut handle, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::StartupTimeout { .. }));
        assert_eq!(handle.state(), LifecycleState::Failed);
        // One inspect per poll tick plus the initial check.
        assert_eq!(runtime.inspects.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_readiness_poll() {
        let runtime = Arc::new(NeverRunning { inspects: AtomicUsize::new(0) });
        let lifecycle = Lifecycle::new(runtime, Duration::from_secs(600));
        let mut handle = lifecycle.create(&test_config()).await.unwrap();
        lifecycle.start(&mut handle).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = lifecycle.wait_until_running(&mut handle, &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let runtime = Arc::new(NeverRunning { inspects: AtomicUsize::new(0) });
        let lifecycle = Lifecycle::new(runtime, Duration::from_secs(1));
        let mut handle = lifecycle.create(&test_config()).await.unwrap();
        lifecycle.remove(&mut handle).await.unwrap();
        assert_eq!(handle.state(), LifecycleState::Removed);
        lifecycle.remove(&mut handle).await.unwrap();
        assert_eq!(handle.state(), LifecycleState::Removed);
    }
}
