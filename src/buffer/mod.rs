//! Latest-frame broadcast slot
//!
//! The buffer holds exactly one frame, the most recent one, together with a
//! generation counter. A single producer publishes into it; any number of
//! streaming sessions wait on it and always wake up to the newest frame.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<FrameBuffer>
//!                     ┌─────────────────────────┐
//!                     │ slot: Mutex<Slot {      │
//!                     │   frame: Option<Frame>, │
//!                     │   generation: u64,      │
//!                     │   closed: bool,         │
//!                     │ }>                      │
//!                     │ notify: Notify          │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Producer]              [Session]               [Session]
//!    publish(frame)          next_frame(g)           next_frame(g)
//!         │                       │                       │
//!         └──► notify_waiters() ──► write part ──► TCP (no lock held)
//! ```
//!
//! # Skip-to-latest
//!
//! There is no queue. A session that is still writing frame `g` while frames
//! `g + 1` and `g + 2` are published receives only `g + 2` on its next call.
//! The producer never waits on any session.

pub mod frame;
pub mod store;

pub use frame::{Frame, NextFrame};
pub use store::FrameBuffer;
