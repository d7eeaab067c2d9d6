use crate::client::{CompletionChunk, Deadline};
use crate::error::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, trace};

/// Counters for a drained completion stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Chunks received and written
    pub chunks: usize,
    /// Bytes written to the sink
    pub bytes: usize,
}

/// Writes the first candidate of every chunk to `sink`, in arrival order.
///
/// Each fragment is flushed before the next chunk is pulled. The first error
/// (from the stream, the deadline or the sink) stops the drain; `chunks` is
/// dropped on return, which cancels the in-flight request. Text already written
/// stays in the sink.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the deadline passes, [`Error::Io`] naming
/// `sink_path` if a write fails, or the stream's own error.
pub fn write_stream<I, W>(
    chunks: I,
    sink: &mut W,
    sink_path: &Path,
    deadline: Deadline,
) -> Result<StreamStats>
where
    I: IntoIterator<Item = Result<CompletionChunk>>,
    W: Write,
{
    let mut stats = StreamStats::default();

    for chunk in chunks {
        let chunk = chunk?;
        deadline.check()?;

        let text = chunk.first_text()?;
        sink.write_all(text.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io(sink_path, e))?;

        stats.chunks += 1;
        stats.bytes += text.len();
        trace!(chunk = stats.chunks, bytes = text.len(), "Wrote completion chunk");
    }

    debug!(
        "Completion stream finished: {} chunks, {} bytes",
        stats.chunks, stats.bytes
    );
    Ok(stats)
}
