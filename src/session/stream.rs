//! Per-client streaming loop
//!
//! Each client on the stream route gets its own `StreamSession`. The session
//! waits on the shared [`FrameBuffer`], encodes whatever frame is newest, and
//! writes it to its own socket. Nothing here holds the buffer's lock while
//! writing, so a stalled client only ever stalls itself.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::buffer::{FrameBuffer, NextFrame};
use crate::error::is_disconnect;
use crate::multipart;
use crate::stats::SessionStats;

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// The frame buffer shut down and the stream was closed cleanly
    Shutdown,
    /// Writing to the client failed or timed out
    Disconnected(io::Error),
}

impl SessionOutcome {
    /// Whether the session ended because of the client
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionOutcome::Disconnected(_))
    }
}

/// Streaming state for one client connection
pub struct StreamSession<W> {
    /// Session ID assigned by the server
    id: u64,

    /// Shared frame source
    buffer: Arc<FrameBuffer>,

    /// This client's output channel, never shared
    writer: W,

    /// Last generation written to the client (0 = none yet)
    last_seen: u64,

    /// Per-part write deadline
    write_timeout: Option<Duration>,

    /// Reused encode buffer
    scratch: BytesMut,

    stats: SessionStats,
}

impl<W> StreamSession<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a session writing to `writer`
    pub fn new(id: u64, buffer: Arc<FrameBuffer>, writer: W) -> Self {
        Self {
            id,
            buffer,
            writer,
            last_seen: 0,
            write_timeout: None,
            scratch: BytesMut::with_capacity(64 * 1024),
            stats: SessionStats::new(),
        }
    }

    /// Give up on a client that cannot take a part within `timeout`
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Session ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Last generation delivered to the client
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Statistics so far
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Stream frames until the buffer shuts down or the client goes away
    ///
    /// Client I/O failures end the session and are reported in the outcome,
    /// they never reach the producer or other sessions.
    pub async fn run(&mut self) -> SessionOutcome {
        let outcome = match self.stream().await {
            Ok(()) => SessionOutcome::Shutdown,
            Err(e) => SessionOutcome::Disconnected(e),
        };

        match outcome {
            SessionOutcome::Shutdown => {
                tracing::debug!(
                    session_id = self.id,
                    frames = self.stats.frames_sent,
                    skipped = self.stats.frames_skipped,
                    "Stream closed by shutdown"
                );
            }
            SessionOutcome::Disconnected(ref e) if is_disconnect(e) => {
                tracing::debug!(
                    session_id = self.id,
                    error = %e,
                    frames = self.stats.frames_sent,
                    "Streaming client disconnected"
                );
            }
            SessionOutcome::Disconnected(ref e) => {
                tracing::info!(
                    session_id = self.id,
                    error = %e,
                    frames = self.stats.frames_sent,
                    "Removed streaming client"
                );
            }
        }

        outcome
    }

    async fn stream(&mut self) -> io::Result<()> {
        self.scratch.clear();
        multipart::encode_envelope(&mut self.scratch);
        self.send().await?;
        self.stats.record_bytes(self.scratch.len());

        loop {
            let (frame, generation) = match self.buffer.next_frame(self.last_seen).await {
                NextFrame::Frame { frame, generation } => (frame, generation),
                NextFrame::Closed => break,
            };

            self.scratch.clear();
            multipart::encode_part(&frame, &mut self.scratch);
            self.last_seen = generation;
            self.send().await?;
            self.stats.record_frame(generation, self.scratch.len());

            tracing::trace!(
                session_id = self.id,
                generation = generation,
                size = frame.len(),
                "Frame sent"
            );
        }

        // Best effort; the client may already be gone
        if let Err(e) = self.writer.shutdown().await {
            tracing::trace!(session_id = self.id, error = %e, "Shutdown after close failed");
        }

        Ok(())
    }

    /// Write the scratch buffer, bounded by the write timeout
    async fn send(&mut self) -> io::Result<()> {
        let timeout = self.write_timeout;
        let write = async {
            self.writer.write_all(&self.scratch).await?;
            self.writer.flush().await
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, write).await.map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, "client stopped reading")
            })?,
            None => write.await,
        }
    }
}
