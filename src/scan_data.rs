use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::analyzer::{AnalyzerKind, SOURCE_EXTENSION};

/// Identity of one scan job: who asked, which source set, which analyzer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct JobKey {
    pub owner: String,
    pub source_set: String,
    pub analyzer: AnalyzerKind,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.owner, self.source_set, self.analyzer)
    }
}

/// One source file selected for analysis. Immutable once the job starts;
/// files added or removed on disk afterwards do not affect the running job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanTarget {
    /// File name relative to the source-set directory, e.g. `Token.sol`.
    pub file_name: String,
    /// Absolute host path of the file.
    pub host_path: PathBuf,
}

/// One file's completed outcome.
#[derive(Clone, Debug, Serialize)]
pub struct ScanResult {
    pub analyzer: AnalyzerKind,
    pub file_name: String,
    /// Sanitized printable-ASCII capture of the analyzer's combined
    /// stdout/stderr stream.
    pub output: String,
    /// Parsed JSON artifact, present only in exec-pipeline mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<serde_json::Value>,
    /// Summarizer text, when the optional summarization step succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A per-file failure recorded under the lenient failure policy.
#[derive(Clone, Debug, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
    /// Sanitized output salvaged from a failed artifact read, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salvaged_output: Option<String>,
}

/// Ordered per-file outcomes for one job. Handed to the result sink exactly
/// once, after every target has been processed; an aborted job hands over
/// nothing.
#[derive(Clone, Debug, Serialize)]
pub struct BatchResult {
    pub key: JobKey,
    /// Results in target order (lexicographic by file name).
    pub results: Vec<ScanResult>,
    /// Per-file failures, populated only under the lenient policy.
    pub failures: Vec<FileFailure>,
}

impl BatchResult {
    pub fn new(key: JobKey) -> Self {
        BatchResult { key, results: Vec::new(), failures: Vec::new() }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves the immutable target list for a job.
///
/// Accepts either a directory (every `.sol` file directly inside it, sorted
/// lexicographically by file name) or a single `.sol` file. The sort makes
/// batch order deterministic regardless of readdir order.
pub fn resolve_targets(input: &Path) -> Result<Vec<ScanTarget>> {
    if !input.exists() {
        bail!("scan input does not exist: {}", input.display());
    }

    if input.is_file() {
        let target = target_from_path(input)
            .with_context(|| format!("not a .{SOURCE_EXTENSION} file: {}", input.display()))?;
        return Ok(vec![target]);
    }

    let entries = fs::read_dir(input)
        .with_context(|| format!("failed to list source set {}", input.display()))?;

    let mut targets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match target_from_path(&path) {
            Some(t) => targets.push(t),
            None => debug!("Skipping non-contract file {}", path.display()),
        }
    }
    targets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(targets)
}

fn target_from_path(path: &Path) -> Option<ScanTarget> {
    if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        return None;
    }
    let file_name = path.file_name()?.to_str()?.to_owned();
    Some(ScanTarget { file_name, host_path: path.to_owned() })
}

/// Directory bound into the analysis containers for a set of targets.
/// Targets always share one parent because they come from one listing.
pub fn bind_dir(input: &Path) -> Result<PathBuf> {
    let dir = if input.is_file() {
        input.parent().context("source file has no parent directory")?.to_owned()
    } else {
        input.to_owned()
    };
    dir.canonicalize().with_context(|| format!("failed to canonicalize {}", dir.display()))
}
