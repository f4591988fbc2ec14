use std::time::Duration;

/// Errors produced while driving one scan job against the container runtime.
///
/// `RuntimeUnavailable` and `ImageNotFound` always abort the job.
/// The per-file kinds (`StartupTimeout`, `AnalysisTimeout`, `StreamError`,
/// `ArtifactParseError`) abort the job under the strict failure policy and
/// are collected alongside successes under the lenient one.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The container engine could not be reached at all.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The analyzer image is absent locally and could not be resolved.
    #[error("analyzer image not found: {image}")]
    ImageNotFound { image: String },

    /// The container never reported a running state within the poll bound.
    #[error("container {container} not running after {}s", .waited.as_secs())]
    StartupTimeout { container: String, waited: Duration },

    /// Log or exec stream collection exceeded the per-file bound.
    #[error("analyzer exceeded the {}s analysis limit", .limit.as_secs())]
    AnalysisTimeout { limit: Duration },

    /// The attached log or exec stream reported an I/O error mid-flight.
    #[error("log stream error: {0}")]
    StreamError(String),

    /// The artifact read step produced text that is not valid JSON.
    /// Carries the sanitized raw text so callers can salvage it.
    #[error("analyzer artifact is not valid JSON: {reason}")]
    ArtifactParseError { reason: String, raw: String },

    /// The job's cancellation token was raised.
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Sanitized analyzer output salvaged from a failed artifact read, if any.
    pub fn salvaged_output(&self) -> Option<&str> {
        match self {
            ScanError::ArtifactParseError { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// True for errors that abort the whole job regardless of failure policy.
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::RuntimeUnavailable(_) | ScanError::ImageNotFound { .. } | ScanError::Cancelled
        )
    }
}
