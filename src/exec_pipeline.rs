//! Exec-session pipeline against one long-lived analysis container.
//!
//! Per file, three strictly sequential exec sessions: remove any stale
//! artifact, run the analyzer (which writes a JSON artifact under the bound
//! mount), then read the artifact back. A session's stream must reach
//! end-of-stream before the next session opens; the awaits below are that
//! ordering. At most one session is ever active per container.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    analyzer::AnalyzerKind,
    errors::ScanError,
    logs::collect_stream,
    runtime::{ContainerId, ContainerRuntime},
    sanitize::sanitize_output,
    scan_data::ScanTarget,
};

/// Captured outcome of one exec-pipeline file cycle.
pub struct ExecOutcome {
    /// Sanitized text of the analyze step's stream.
    pub output: String,
    /// The parsed JSON artifact from the read step.
    pub artifact: serde_json::Value,
}

pub struct ExecPipeline {
    runtime: Arc<dyn ContainerRuntime>,
    container: ContainerId,
    analysis_timeout: Duration,
}

impl ExecPipeline {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        container: ContainerId,
        analysis_timeout: Duration,
    ) -> Self {
        ExecPipeline { runtime, container, analysis_timeout }
    }

    /// Runs the cleanup/analyze/read protocol for one target.
    pub async fn run_file(
        &self,
        analyzer: AnalyzerKind,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ScanError> {
        self.cleanup_stale_artifact(analyzer, target, cancel).await;

        let analyze_cmd = analyzer.analyze_command(&target.file_name);
        let output = self.run_step(&analyze_cmd, cancel).await?;
        debug!("Analyzer finished for {} ({} bytes captured)", target.file_name, output.len());

        let read_cmd = analyzer.read_artifact_command(&target.file_name);
        let artifact_text = self.run_step(&read_cmd, cancel).await?;
        let artifact = serde_json::from_str(&artifact_text).map_err(|e| {
            ScanError::ArtifactParseError { reason: e.to_string(), raw: output.clone() }
        })?;

        Ok(ExecOutcome { output, artifact })
    }

    /// Deletes a prior run's artifact. A missing file is not an error, and
    /// neither is anything else here; failures are logged and ignored.
    async fn cleanup_stale_artifact(
        &self,
        analyzer: AnalyzerKind,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) {
        let cmd = analyzer.cleanup_command(&target.file_name);
        if let Err(e) = self.run_step(&cmd, cancel).await {
            warn!("Artifact cleanup failed for {}: {e}", target.file_name);
        }
    }

    /// Opens one exec session and drains its stream to end-of-stream.
    async fn run_step(
        &self,
        command: &[String],
        cancel: &CancellationToken,
    ) -> Result<String, ScanError> {
        let stream = self.runtime.exec(&self.container, command).await?;
        let bytes = collect_stream(stream, self.analysis_timeout, cancel).await?;
        Ok(sanitize_output(&bytes))
    }
}
