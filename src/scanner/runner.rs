use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    container::Lifecycle,
    errors::ScanError,
    runtime::ContainerRuntime,
    scan_data::{
        bind_dir, resolve_targets, BatchResult, FileFailure, JobKey, ScanResult, ScanTarget,
    },
    scanner::{
        backend::{ephemeral_cycle, BackendMode, SharedContainer},
        summary::ScanTotals,
    },
    sink::ResultSink,
    summarizer::Summarizer,
};

/// What the coordinator does when one file's cycle fails with a non-fatal
/// error. Job-fatal errors (engine unreachable, image missing, cancellation)
/// always abort regardless of policy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole job on the first per-file error; the sink gets nothing.
    #[default]
    Strict,
    /// Record the failure and keep going; the sink gets successes plus the
    /// failure list.
    Lenient,
}

/// Everything that defines one scan job. Built by the CLI or directly by
/// tests; immutable for the job's duration.
#[derive(Clone, Debug)]
pub struct ScanJobSpec {
    pub key: JobKey,
    /// Source-set directory or a single `.sol` file.
    pub input: PathBuf,
    pub backend: BackendMode,
    pub failure_policy: FailurePolicy,
    pub startup_timeout: Duration,
    pub analysis_timeout: Duration,
}

pub async fn run_scan(
    spec: &ScanJobSpec,
    runtime: Arc<dyn ContainerRuntime>,
    summarizer: Option<Arc<dyn Summarizer>>,
    sink: &mut dyn ResultSink,
    cancel: CancellationToken,
    use_progress: bool,
) -> Result<ScanTotals> {
    run_scan_job(spec, runtime, summarizer, sink, cancel, use_progress)
        .await
        .with_context(|| format!("Failed to run scan job {}", spec.key))
}

async fn run_scan_job(
    spec: &ScanJobSpec,
    runtime: Arc<dyn ContainerRuntime>,
    summarizer: Option<Arc<dyn Summarizer>>,
    sink: &mut dyn ResultSink,
    cancel: CancellationToken,
    use_progress: bool,
) -> Result<ScanTotals> {
    let analyzer = spec.key.analyzer;
    if spec.backend == BackendMode::SharedExec && !analyzer.supports_shared_exec() {
        bail!("{analyzer} does not support the shared-exec backend; use the ephemeral backend");
    }

    // The target list is fixed here; later filesystem changes do not affect
    // this job.
    let targets = resolve_targets(&spec.input)?;
    if targets.is_empty() {
        bail!("No contract sources to scan in {}", spec.input.display());
    }
    let bind = bind_dir(&spec.input)?;

    info!(
        "Scanning {} file(s) from {} with {analyzer} ({} backend)",
        targets.len(),
        spec.input.display(),
        spec.backend,
    );

    let start_time = Instant::now();
    let lifecycle = Lifecycle::new(runtime, spec.startup_timeout);
    let mut batch = BatchResult::new(spec.key.clone());
    let progress = make_progress(use_progress);

    match spec.backend {
        BackendMode::Ephemeral => {
            for target in &targets {
                progress.set_message(format!("analyzing {}", target.file_name));
                let cycle = ephemeral_cycle(
                    &lifecycle,
                    analyzer,
                    &bind,
                    target,
                    spec.analysis_timeout,
                    &cancel,
                )
                .await;
                record_outcome(spec, &mut batch, target, cycle, summarizer.as_deref()).await?;
                progress.inc(1);
            }
        }
        BackendMode::SharedExec => {
            let shared = SharedContainer::set_up(
                &lifecycle,
                analyzer,
                &bind,
                spec.analysis_timeout,
                &cancel,
            )
            .await?;

            // Teardown runs whether or not the loop aborts; an abort error
            // takes precedence over a teardown error.
            let mut abort = None;
            for target in &targets {
                progress.set_message(format!("analyzing {}", target.file_name));
                let cycle = shared.scan_file(analyzer, target, &cancel).await;
                if let Err(e) =
                    record_outcome(spec, &mut batch, target, cycle, summarizer.as_deref()).await
                {
                    abort = Some(e);
                    break;
                }
                progress.inc(1);
            }
            let teardown = shared.tear_down(&lifecycle).await;
            if let Some(e) = abort {
                return Err(e);
            }
            teardown?;
        }
    }
    progress.finish_and_clear();

    let totals = ScanTotals {
        files: targets.len(),
        succeeded: batch.results.len(),
        failed: batch.failures.len(),
        duration: start_time.elapsed(),
    };
    sink.accept(batch).context("result sink rejected the batch")?;
    Ok(totals)
}

/// Folds one file's cycle outcome into the batch. Returns an error exactly
/// when the job must abort.
async fn record_outcome(
    spec: &ScanJobSpec,
    batch: &mut BatchResult,
    target: &ScanTarget,
    cycle: Result<ScanResult, ScanError>,
    summarizer: Option<&dyn Summarizer>,
) -> Result<()> {
    match cycle {
        Ok(mut result) => {
            if let Some(summarizer) = summarizer {
                // Summarization failures are logged and the raw output kept.
                match summarizer.summarize(&spec.key.owner, &result.output).await {
                    Ok(text) => result.summary = Some(text),
                    Err(e) => warn!("Summarization failed for {}: {e:#}", target.file_name),
                }
            }
            batch.results.push(result);
            Ok(())
        }
        Err(e) if e.is_job_fatal() || spec.failure_policy == FailurePolicy::Strict => {
            Err(anyhow::Error::new(e).context(format!("analysis failed for {}", target.file_name)))
        }
        Err(e) => {
            warn!("Continuing past failure for {}: {e}", target.file_name);
            batch.failures.push(FileFailure {
                file_name: target.file_name.clone(),
                salvaged_output: e.salvaged_output().map(str::to_owned),
                error: e.to_string(),
            });
            Ok(())
        }
    }
}

fn make_progress(use_progress: bool) -> ProgressBar {
    if use_progress {
        let style =
            ProgressStyle::with_template("{spinner} {pos} done {msg}").expect("progress template");
        let pb = ProgressBar::new_spinner().with_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    }
}

/// Convenience used by `JobKey` construction in the CLI; kept here so tests
/// build specs the same way the binary does.
pub fn job_key(owner: &str, source_set: &str, analyzer: crate::analyzer::AnalyzerKind) -> JobKey {
    JobKey { owner: owner.to_owned(), source_set: source_set.to_owned(), analyzer }
}
