//! Log stream collection.
//!
//! The collector folds a container's demultiplexed stdout+stderr stream into
//! one buffer and does not return until end-of-stream, an error, the per-file
//! deadline, or cancellation. End-of-stream is the synchronization signal the
//! coordinator relies on: once it fires, the analyzer has exited and its
//! artifacts are final. No partial buffer is ever returned on success.

use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{errors::ScanError, runtime::LogStream};

/// Accumulates `stream` to completion, bounded by `limit`.
pub async fn collect_stream(
    mut stream: LogStream,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ScanError> {
    let mut buffer = Vec::new();
    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);

    loop {
        // Cancellation and the deadline take priority over a ready chunk, so
        // a fast stream cannot starve either signal.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            _ = &mut deadline => return Err(ScanError::AnalysisTimeout { limit }),
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    trace!("Collected {} bytes", bytes.len());
                    buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(buffer),
            },
        }
    }
}
