//! Writing dispatch output to an async transport.
//!
//! A regular dispatch produces one JSON batch, written and flushed at once.
//! A streamed dispatch is pumped chunk by chunk: every chunk is written and
//! flushed before the next handler step runs, so the browser sees progress
//! while the handler is still working.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher::dispatch ─► Output::Json   ─► write + flush ─► transport
//!                      └► Output::Stream ─► (next chunk ─► write + flush)* ─► transport
//! ```

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{DomwireError, Result};
use crate::response::{ChunkStream, Output};

/// Write `output` to `writer`, returning the number of bytes written.
///
/// # Errors
///
/// The first write or handler error. Commands queued after the last
/// written chunk are lost.
pub async fn write_output<W>(output: Output, writer: &mut W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    match output {
        Output::Json(json) => {
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
            Ok(json.len())
        }
        Output::Stream(stream) => stream.pump(writer).await,
    }
}

impl ChunkStream {
    /// Drive the stream to its end, writing and flushing every chunk.
    ///
    /// Handler steps run on tokio's blocking pool, one `spawn_blocking` per
    /// chunk. Must be called from within a tokio runtime.
    ///
    /// Returns the total number of bytes written.
    pub async fn pump<W>(self, writer: &mut W) -> Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stream = self;
        let mut written = 0usize;
        let mut chunks = 0usize;
        loop {
            let (next, rest) = next_chunk(stream).await?;
            stream = rest;
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            writer.flush().await?;
            written += chunk.len();
            chunks += 1;
        }
        tracing::debug!("Stream finished: {} chunks, {} bytes", chunks, written);
        Ok(written)
    }
}

/// Run the stream up to its next chunk on the blocking pool.
async fn next_chunk(mut stream: ChunkStream) -> Result<(Option<Result<Bytes>>, ChunkStream)> {
    let joined = tokio::task::spawn_blocking(move || {
        let next = stream.next();
        (next, stream)
    })
    .await;
    match joined {
        Ok(pair) => Ok(pair),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(DomwireError::Io(std::io::Error::other(e))),
    }
}
