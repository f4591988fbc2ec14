//! Docker Engine implementation of [`ContainerRuntime`] via bollard.

use bollard::{
    container::{
        Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
        StartContainerOptions,
    },
    errors::Error as EngineError,
    exec::{CreateExecOptions, StartExecResults},
    service::HostConfig,
    Docker,
};
use futures::StreamExt;
use tracing::{debug, trace};

use super::{ContainerConfig, ContainerId, ContainerRuntime, LogStream};
use crate::{analyzer::CONTAINER_MOUNT, errors::ScanError};

/// Shared Docker Engine client. Cheap to clone; one instance serves any
/// number of sequential jobs.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects with the platform defaults (unix socket or named pipe,
    /// honoring `DOCKER_HOST`).
    pub fn connect() -> Result<Self, ScanError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ScanError::RuntimeUnavailable(e.to_string()))?;
        Ok(DockerRuntime { docker })
    }
}

/// Maps an engine error on container creation. A 404 at this point means the
/// image reference could not be resolved; everything else is the engine
/// itself being unreachable or broken.
fn map_create_error(err: EngineError, image: &str) -> ScanError {
    match err {
        EngineError::DockerResponseServerError { status_code: 404, .. } => {
            ScanError::ImageNotFound { image: image.to_owned() }
        }
        other => ScanError::RuntimeUnavailable(other.to_string()),
    }
}

fn map_engine_error(err: EngineError) -> ScanError {
    ScanError::RuntimeUnavailable(err.to_string())
}

fn into_log_stream(
    stream: impl futures::Stream<Item = Result<LogOutput, EngineError>> + Send + 'static,
) -> LogStream {
    stream
        .map(|item| {
            item.map(LogOutput::into_bytes).map_err(|e| ScanError::StreamError(e.to_string()))
        })
        .boxed()
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, config: &ContainerConfig) -> Result<ContainerId, ScanError> {
        let bind = format!("{}:{}", config.bind_host_dir.display(), CONTAINER_MOUNT);
        let cmd = if config.command.is_empty() { None } else { Some(config.command.clone()) };
        let create = Config {
            image: Some(config.image.clone()),
            cmd,
            tty: Some(config.tty),
            host_config: Some(HostConfig { binds: Some(vec![bind]), ..Default::default() }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, create)
            .await
            .map_err(|e| map_create_error(e, &config.image))?;
        for warning in &response.warnings {
            debug!("Engine warning for {}: {warning}", config.image);
        }
        Ok(ContainerId(response.id))
    }

    async fn start(&self, id: &ContainerId) -> Result<(), ScanError> {
        self.docker
            .start_container(&id.0, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_engine_error)
    }

    async fn is_running(&self, id: &ContainerId) -> Result<bool, ScanError> {
        let inspect =
            self.docker.inspect_container(&id.0, None).await.map_err(map_engine_error)?;
        let running = inspect.state.and_then(|s| s.running).unwrap_or(false);
        trace!("Container {id} running={running}");
        Ok(running)
    }

    async fn attach_logs(&self, id: &ContainerId) -> Result<LogStream, ScanError> {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        Ok(into_log_stream(self.docker.logs(&id.0, Some(options))))
    }

    async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<LogStream, ScanError> {
        let options = CreateExecOptions {
            cmd: Some(command.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let created =
            self.docker.create_exec(&id.0, options).await.map_err(map_engine_error)?;
        match self.docker.start_exec(&created.id, None).await.map_err(map_engine_error)? {
            StartExecResults::Attached { output, .. } => Ok(into_log_stream(output)),
            // Cannot happen with attach_stdout/attach_stderr set.
            StartExecResults::Detached => {
                Err(ScanError::StreamError("exec session started detached".into()))
            }
        }
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), ScanError> {
        let options = RemoveContainerOptions { force: true, ..Default::default() };
        match self.docker.remove_container(&id.0, Some(options)).await {
            Ok(()) => Ok(()),
            // Already gone counts as removed.
            Err(EngineError::DockerResponseServerError { status_code: 404, .. }) => {
                debug!("Container {id} already removed");
                Ok(())
            }
            Err(e) => Err(map_engine_error(e)),
        }
    }
}
