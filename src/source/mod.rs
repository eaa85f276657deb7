//! Frame producers
//!
//! A [`FrameSource`] yields encoded frames; [`spawn_producer`] pulls from it
//! at a fixed rate and publishes into a [`FrameBuffer`](crate::buffer::FrameBuffer).
//!
//! Capture code that already runs its own loop (a camera callback thread,
//! for instance) does not need any of this and can call
//! [`FrameBuffer::publish`](crate::buffer::FrameBuffer::publish) directly.

use std::future::Future;

use crate::buffer::Frame;
use crate::error::Result;

pub mod directory;
pub mod producer;

pub use directory::DirectorySource;
pub use producer::spawn_producer;

/// Something that produces encoded frames
pub trait FrameSource: Send {
    /// Produce the next frame
    ///
    /// `Ok(None)` means the source is exhausted and no more frames will come.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send;
}
