//! Frame buffer implementation
//!
//! The single shared slot between the producer and every streaming session.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::frame::{Frame, NextFrame};

/// Shared state behind the lock
#[derive(Debug, Default)]
struct Slot {
    /// Most recently published frame
    frame: Option<Frame>,
    /// Number of frames published so far (0 = nothing yet)
    generation: u64,
    /// Set once by `shutdown`
    closed: bool,
}

/// Single-slot, latest-value broadcast buffer
///
/// The lock only guards a few words of state and is never held across an
/// await point or a socket write. Waiters are woken with
/// [`Notify::notify_waiters`], so `publish` costs the same no matter how many
/// sessions are connected or how slow they are.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl FrameBuffer {
    /// Create an empty buffer at generation 0
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        // Slot updates are single assignments, a panicked holder cannot leave it torn
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current frame and wake every waiting session
    ///
    /// Returns the generation assigned to `frame`. After [`shutdown`](Self::shutdown)
    /// the frame is discarded and the last generation is returned unchanged.
    pub fn publish(&self, frame: Frame) -> u64 {
        let generation = {
            let mut slot = self.slot();
            if slot.closed {
                tracing::trace!(generation = slot.generation, "Publish after shutdown ignored");
                return slot.generation;
            }
            slot.generation += 1;
            slot.frame = Some(frame);
            slot.generation
        };

        self.notify.notify_waiters();
        tracing::trace!(generation = generation, "Frame published");

        generation
    }

    /// Wait for a frame newer than `last_seen`
    ///
    /// Returns immediately if one is already available, handing back the
    /// newest frame even if several were published since `last_seen`.
    /// Otherwise waits for the next publish. Returns [`NextFrame::Closed`]
    /// once the buffer has been shut down.
    pub async fn next_frame(&self, last_seen: u64) -> NextFrame {
        loop {
            // Register before inspecting the slot so a publish landing
            // between the check and the await still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(next) = self.try_next(last_seen) {
                return next;
            }

            notified.await;
        }
    }

    /// Non-blocking variant of [`next_frame`](Self::next_frame)
    ///
    /// Returns `None` when nothing newer than `last_seen` has been published.
    pub fn try_next(&self, last_seen: u64) -> Option<NextFrame> {
        let slot = self.slot();

        if slot.closed {
            return Some(NextFrame::Closed);
        }

        match slot.frame {
            Some(ref frame) if slot.generation > last_seen => Some(NextFrame::Frame {
                frame: frame.clone(),
                generation: slot.generation,
            }),
            _ => None,
        }
    }

    /// Release every waiter with [`NextFrame::Closed`]
    ///
    /// Idempotent. All later calls to `next_frame` return `Closed` at once.
    pub fn shutdown(&self) {
        let generation = {
            let mut slot = self.slot();
            if slot.closed {
                return;
            }
            slot.closed = true;
            slot.generation
        };

        self.notify.notify_waiters();
        tracing::info!(generation = generation, "Frame buffer shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.slot().closed
    }

    /// Current generation (0 until the first publish)
    pub fn generation(&self) -> u64 {
        self.slot().generation
    }

    /// Most recent frame, if any, regardless of shutdown state
    pub fn latest(&self) -> Option<(Frame, u64)> {
        let slot = self.slot();
        slot.frame.clone().map(|frame| (frame, slot.generation))
    }
}
