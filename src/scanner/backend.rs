//! The two orchestration shapes behind one strategy surface.
//!
//! `Ephemeral` runs one disposable container per file and reads its log
//! stream. `SharedExec` starts one long-lived container per job and drives
//! the exec pipeline against it per file. Both shapes remove every container
//! they create, on success, failure, and cancellation alike.

use std::{path::Path, sync::Arc, time::Duration};

use clap::ValueEnum;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    analyzer::AnalyzerKind,
    container::{ContainerHandle, Lifecycle},
    errors::ScanError,
    exec_pipeline::ExecPipeline,
    logs::collect_stream,
    runtime::ContainerConfig,
    sanitize::sanitize_output,
    scan_data::{ScanResult, ScanTarget},
};

/// Which orchestration shape a job uses.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, ValueEnum, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum BackendMode {
    /// One disposable container per file.
    #[default]
    Ephemeral,
    /// One long-lived container per job, driven through exec sessions.
    SharedExec,
}

/// Runs one file through a disposable container: create, start, attach logs,
/// collect to end-of-stream, remove. Removal is attempted no matter how the
/// middle steps end, and a removal failure surfaces only when the analysis
/// itself succeeded.
pub async fn ephemeral_cycle(
    lifecycle: &Lifecycle,
    analyzer: AnalyzerKind,
    bind_dir: &Path,
    target: &ScanTarget,
    analysis_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ScanResult, ScanError> {
    let config = ContainerConfig {
        image: analyzer.image().to_owned(),
        command: analyzer.command(&target.file_name),
        bind_host_dir: bind_dir.to_owned(),
        tty: false,
    };
    let mut handle = lifecycle.create(&config).await?;

    let collected = drive_ephemeral(lifecycle, &mut handle, analysis_timeout, cancel).await;
    let removal = lifecycle.remove(&mut handle).await;

    let bytes = collected?;
    removal?;

    Ok(ScanResult {
        analyzer,
        file_name: target.file_name.clone(),
        output: sanitize_output(&bytes),
        artifact: None,
        summary: None,
    })
}

async fn drive_ephemeral(
    lifecycle: &Lifecycle,
    handle: &mut ContainerHandle,
    analysis_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ScanError> {
    lifecycle.start(handle).await?;
    // No readiness poll here: the followed log stream ends exactly when the
    // analyzer process exits, which is the synchronization the cycle needs.
    let stream = lifecycle.attach_logs(handle).await?;
    collect_stream(stream, analysis_timeout, cancel).await
}

/// The per-job long-lived container used by [`BackendMode::SharedExec`].
pub struct SharedContainer {
    handle: ContainerHandle,
    pipeline: ExecPipeline,
}

impl SharedContainer {
    /// Creates and starts the shared container, then polls until the engine
    /// reports it running. On any failure the partially set up container is
    /// removed before the error propagates.
    pub async fn set_up(
        lifecycle: &Lifecycle,
        analyzer: AnalyzerKind,
        bind_dir: &Path,
        analysis_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SharedContainer, ScanError> {
        let config = ContainerConfig {
            image: analyzer.shared_image().to_owned(),
            command: Vec::new(),
            bind_host_dir: bind_dir.to_owned(),
            tty: true,
        };
        let mut handle = lifecycle.create(&config).await?;

        let ready = async {
            lifecycle.start(&mut handle).await?;
            lifecycle.wait_until_running(&mut handle, cancel).await
        }
        .await;

        if let Err(e) = ready {
            let _ = lifecycle.remove(&mut handle).await;
            return Err(e);
        }

        debug!("Shared container {} ready", handle.id());
        let pipeline = ExecPipeline::new(
            Arc::clone(lifecycle.runtime()),
            handle.id().clone(),
            analysis_timeout,
        );
        Ok(SharedContainer { handle, pipeline })
    }

    /// Runs the exec pipeline for one target.
    pub async fn scan_file(
        &self,
        analyzer: AnalyzerKind,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let outcome = self.pipeline.run_file(analyzer, target, cancel).await?;
        Ok(ScanResult {
            analyzer,
            file_name: target.file_name.clone(),
            output: outcome.output,
            artifact: Some(outcome.artifact),
            summary: None,
        })
    }

    /// Removes the shared container. Called on every job exit path.
    pub async fn tear_down(mut self, lifecycle: &Lifecycle) -> Result<(), ScanError> {
        lifecycle.remove(&mut self.handle).await
    }
}
