use std::{
    fs::File,
    io::{stdout, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum, ValueHint};
use strum::Display;

/// Report destination and format flags shared by reporting commands.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, short = 'f', value_name = "FORMAT", default_value = "pretty")]
    pub format: ReportOutputFormat,
}

impl OutputArgs {
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Buffered writer for the chosen destination.
    pub fn get_writer(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            None => Ok(Box::new(BufWriter::new(stdout()))),
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, ValueEnum, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum ReportOutputFormat {
    #[default]
    Pretty,
    Json,
}
