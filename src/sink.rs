use anyhow::Result;

use crate::scan_data::BatchResult;

/// Downstream consumer of a finished batch. The coordinator hands over either
/// one complete batch or nothing at all; a sink never sees a silently
/// truncated job.
pub trait ResultSink: Send {
    fn accept(&mut self, batch: BatchResult) -> Result<()>;
}

/// In-memory sink. Backs the CLI reporter and the orchestration tests.
#[derive(Default)]
pub struct MemorySink {
    batches: Vec<BatchResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[BatchResult] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<BatchResult> {
        self.batches
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, batch: BatchResult) -> Result<()> {
        self.batches.push(batch);
        Ok(())
    }
}
