//! Fixed-rate producer task

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::FrameSource;
use crate::buffer::FrameBuffer;
use crate::error::Result;

/// Publish frames from `source` into `buffer` every `interval`
///
/// The task ends when the source is exhausted, when the source fails, or
/// once the buffer has been shut down, and yields the number of frames
/// published. Sessions are unaffected by a producer that stops: they keep
/// waiting for the next publish or for shutdown.
pub fn spawn_producer<S>(
    mut source: S,
    buffer: Arc<FrameBuffer>,
    interval: Duration,
) -> JoinHandle<Result<u64>>
where
    S: FrameSource + 'static,
{
    // tokio intervals must be non-zero
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow source should not cause a burst of catch-up frames
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut published = 0u64;

        tracing::info!(interval_ms = interval.as_millis() as u64, "Producer started");

        loop {
            ticker.tick().await;

            if buffer.is_shut_down() {
                tracing::debug!(frames = published, "Producer stopping: buffer shut down");
                break;
            }

            match source.next_frame().await {
                Ok(Some(frame)) => {
                    buffer.publish(frame);
                    published += 1;
                }
                Ok(None) => {
                    tracing::info!(frames = published, "Frame source exhausted");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, frames = published, "Frame source failed");
                    return Err(e);
                }
            }
        }

        Ok(published)
    })
}
