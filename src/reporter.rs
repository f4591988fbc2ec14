//! Batch report rendering, pretty or JSON.

use std::io::Write;

use anyhow::Result;

use crate::{
    cli::commands::output::{OutputArgs, ReportOutputFormat},
    scan_data::BatchResult,
};

pub fn run(batch: &BatchResult, output_args: &OutputArgs) -> Result<()> {
    let mut writer = output_args.get_writer()?;
    match output_args.format {
        ReportOutputFormat::Pretty => write_pretty(&mut writer, batch)?,
        ReportOutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, batch)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_pretty(writer: &mut dyn Write, batch: &BatchResult) -> Result<()> {
    writeln!(writer, "Scan results for {}", batch.key)?;

    for result in &batch.results {
        writeln!(writer)?;
        writeln!(writer, "=== {} [{}]", result.file_name, result.analyzer)?;
        if let Some(summary) = &result.summary {
            writeln!(writer, "Summary:")?;
            writeln!(writer, "{summary}")?;
        }
        if let Some(artifact) = &result.artifact {
            writeln!(writer, "Artifact:")?;
            writeln!(writer, "{}", serde_json::to_string_pretty(artifact)?)?;
        }
        writeln!(writer, "Output:")?;
        if result.output.is_empty() {
            writeln!(writer, "(no output captured)")?;
        } else {
            writeln!(writer, "{}", result.output)?;
        }
    }

    if !batch.failures.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Failures:")?;
        for failure in &batch.failures {
            writeln!(writer, "  {}: {}", failure.file_name, failure.error)?;
            if let Some(salvaged) = &failure.salvaged_output {
                writeln!(writer, "    salvaged output: {salvaged}")?;
            }
        }
    }
    Ok(())
}
