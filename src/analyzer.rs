use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Directory inside every analysis container where the host source-set
/// directory is bound read-write.
pub const CONTAINER_MOUNT: &str = "/mnt";

/// Extension of recognized contract source files.
pub const SOURCE_EXTENSION: &str = "sol";

/// The static analyzers soliscan knows how to drive.
///
/// Each variant selects a container image, a command template, and an output
/// shape (plain stream text for Mythril, stream text plus an optional JSON
/// artifact for Slither).
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Mythril,
    Slither,
}

impl AnalyzerKind {
    /// Image used for one-ephemeral-container-per-file scans.
    pub fn image(&self) -> &'static str {
        match self {
            AnalyzerKind::Mythril => "mythril/myth:latest",
            AnalyzerKind::Slither => "trailofbits/slither:latest",
        }
    }

    /// Image used for the long-lived shared container in exec-pipeline mode.
    /// The toolbox image keeps a tty shell alive between exec sessions.
    pub fn shared_image(&self) -> &'static str {
        "trailofbits/eth-security-toolbox"
    }

    /// Command for an ephemeral container analyzing `file_name` under the
    /// bound mount.
    pub fn command(&self, file_name: &str) -> Vec<String> {
        let target = format!("{CONTAINER_MOUNT}/{file_name}");
        match self {
            AnalyzerKind::Mythril => {
                vec!["analyze".into(), target, "-o".into(), "json".into()]
            }
            AnalyzerKind::Slither => {
                let artifact = format!("{CONTAINER_MOUNT}/output-{file_name}.json");
                vec!["slither".into(), target, "--json".into(), artifact]
            }
        }
    }

    /// Path of the per-file JSON artifact written in exec-pipeline mode.
    pub fn artifact_path(&self, file_name: &str) -> String {
        format!("{CONTAINER_MOUNT}/{file_name}.json")
    }

    /// Exec command that removes a stale artifact from a prior run.
    pub fn cleanup_command(&self, file_name: &str) -> Vec<String> {
        vec!["rm".into(), "-f".into(), self.artifact_path(file_name)]
    }

    /// Exec command that runs the analyzer and writes the JSON artifact.
    pub fn analyze_command(&self, file_name: &str) -> Vec<String> {
        let target = format!("{CONTAINER_MOUNT}/{file_name}");
        match self {
            AnalyzerKind::Slither => {
                vec!["slither".into(), target, "--json".into(), self.artifact_path(file_name)]
            }
            // Mythril has no artifact-writing template; supports_shared_exec
            // gates this before any exec session is opened.
            AnalyzerKind::Mythril => {
                vec!["myth".into(), "analyze".into(), target, "-o".into(), "json".into()]
            }
        }
    }

    /// Exec command that reads the artifact back out of the container.
    pub fn read_artifact_command(&self, file_name: &str) -> Vec<String> {
        vec!["cat".into(), self.artifact_path(file_name)]
    }

    /// Whether this analyzer can run in shared-container exec-pipeline mode.
    /// Mythril emits JSON on stdout only and never writes the `/mnt` artifact
    /// the read step depends on.
    pub fn supports_shared_exec(&self) -> bool {
        matches!(self, AnalyzerKind::Slither)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mythril_command_targets_mounted_file() {
        let cmd = AnalyzerKind::Mythril.command("Token.sol");
        assert_eq!(cmd, ["analyze", "/mnt/Token.sol", "-o", "json"]);
    }

    #[test]
    fn slither_command_names_artifact() {
        let cmd = AnalyzerKind::Slither.command("Token.sol");
        assert_eq!(cmd, ["slither", "/mnt/Token.sol", "--json", "/mnt/output-Token.sol.json"]);
    }

    #[test]
    fn exec_pipeline_paths_are_derived_from_file_name() {
        let kind = AnalyzerKind::Slither;
        assert_eq!(kind.artifact_path("A.sol"), "/mnt/A.sol.json");
        assert_eq!(kind.cleanup_command("A.sol"), ["rm", "-f", "/mnt/A.sol.json"]);
        assert_eq!(kind.read_artifact_command("A.sol"), ["cat", "/mnt/A.sol.json"]);
    }

    #[test]
    fn shared_exec_support() {
        assert!(AnalyzerKind::Slither.supports_shared_exec());
        assert!(!AnalyzerKind::Mythril.supports_shared_exec());
    }
}
