use clap::Args;

/// `soliscan analyzers` command
#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzersArgs {}

/// Prints the supported analyzers with their images and modes.
pub fn run_analyzers_list() {
    use crate::analyzer::AnalyzerKind;

    println!("{:<10} {:<30} backends", "Analyzer", "Image");
    for kind in [AnalyzerKind::Mythril, AnalyzerKind::Slither] {
        let backends =
            if kind.supports_shared_exec() { "ephemeral, shared-exec" } else { "ephemeral" };
        println!("{:<10} {:<30} {backends}", kind.to_string(), kind.image());
    }
}
