//! Capability boundary over the container engine.
//!
//! Everything engine-facing goes through [`ContainerRuntime`], so the
//! orchestration layers can be driven against a fake in tests. One client may
//! be shared across jobs (dispatch is stateless); container identity and exec
//! exclusivity are owned by the caller.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::errors::ScanError;

pub mod docker;

pub use docker::DockerRuntime;

/// Demultiplexed stdout+stderr byte stream of a container or exec session.
pub type LogStream = BoxStream<'static, Result<Bytes, ScanError>>;

/// Engine-assigned container identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Engines hand back long hex ids; the short prefix is what `docker ps` shows.
        let short = if self.0.len() > 12 { &self.0[..12] } else { &self.0 };
        f.write_str(short)
    }
}

/// Parameters for creating one analysis container.
#[derive(Clone, Debug)]
pub struct ContainerConfig {
    pub image: String,
    /// Command argument vector; empty means the image default.
    pub command: Vec<String>,
    /// Host directory bound read-write at [`crate::analyzer::CONTAINER_MOUNT`].
    pub bind_host_dir: std::path::PathBuf,
    pub tty: bool,
}

/// The container engine operations the scan core depends on.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Requests a new container. `RuntimeUnavailable` when the engine cannot
    /// be reached, `ImageNotFound` when the image cannot be resolved.
    async fn create(&self, config: &ContainerConfig) -> Result<ContainerId, ScanError>;

    async fn start(&self, id: &ContainerId) -> Result<(), ScanError>;

    /// Whether the engine currently reports the container as running.
    async fn is_running(&self, id: &ContainerId) -> Result<bool, ScanError>;

    /// Attaches to the combined, followed stdout/stderr stream.
    async fn attach_logs(&self, id: &ContainerId) -> Result<LogStream, ScanError>;

    /// Starts one exec session and returns its attached stream. Callers must
    /// drain the stream to end-of-stream before opening another session in
    /// the same container.
    async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<LogStream, ScanError>;

    /// Force-removes the container and its resources. Idempotent; removing a
    /// container that is already gone is not an error.
    async fn remove(&self, id: &ContainerId) -> Result<(), ScanError>;
}
