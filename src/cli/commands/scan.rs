use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, ValueHint};

use crate::{
    analyzer::AnalyzerKind,
    cli::commands::output::OutputArgs,
    scanner::{job_key, BackendMode, FailurePolicy, ScanJobSpec},
};

/// `soliscan scan` command and flags
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Source-set directory or a single .sol file to analyze
    #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
    pub input: PathBuf,

    /// Static analyzer to run
    #[arg(long, short = 'a', default_value = "slither")]
    pub analyzer: AnalyzerKind,

    /// Orchestration backend
    #[arg(long, short = 'b', default_value = "ephemeral")]
    pub backend: BackendMode,

    /// Identity the batch result is keyed by
    #[arg(long, default_value = "local", value_name = "OWNER")]
    pub owner: String,

    /// Source-set name for the batch key; defaults to the input's file name
    #[arg(long = "source-set", value_name = "NAME")]
    pub source_set: Option<String>,

    /// Bound on container startup readiness polling
    #[arg(long = "startup-timeout", default_value_t = 60, value_name = "SECONDS")]
    pub startup_timeout: u64,

    /// Bound on one file's analysis, log collection included
    #[arg(long = "analysis-timeout", default_value_t = 600, value_name = "SECONDS")]
    pub analysis_timeout: u64,

    /// Collect per-file failures and keep scanning instead of aborting the
    /// job on the first one
    #[arg(long = "keep-going", short = 'k', default_value_t = false)]
    pub keep_going: bool,

    /// Skip the AI summarization step even when an API key is configured
    #[arg(long = "no-summarize", default_value_t = false)]
    pub no_summarize: bool,

    #[command(flatten)]
    pub output_args: OutputArgs,
}

impl ScanArgs {
    /// Converts CLI arguments into the immutable job spec the coordinator
    /// consumes.
    pub fn to_spec(&self) -> Result<ScanJobSpec> {
        let source_set = match &self.source_set {
            Some(name) => name.clone(),
            None => self
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("cannot derive a source-set name from the input path")?,
        };
        let failure_policy =
            if self.keep_going { FailurePolicy::Lenient } else { FailurePolicy::Strict };

        Ok(ScanJobSpec {
            key: job_key(&self.owner, &source_set, self.analyzer),
            input: self.input.clone(),
            backend: self.backend,
            failure_policy,
            startup_timeout: Duration::from_secs(self.startup_timeout),
            analysis_timeout: Duration::from_secs(self.analysis_timeout),
        })
    }
}
