//! Frame types handed from the producer to streaming sessions

use bytes::Bytes;

use crate::error::{Error, Result};

/// One complete encoded image (normally a JPEG)
///
/// The payload is never interpreted. Cloning is cheap: every session that
/// reads a frame shares the same reference-counted allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Wrap an encoded image
    ///
    /// Returns [`Error::EmptyFrame`] for an empty payload.
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(Error::EmptyFrame);
        }
        Ok(Self { data })
    }

    /// Wrap a static byte slice
    pub fn from_static(data: &'static [u8]) -> Result<Self> {
        Self::new(Bytes::from_static(data))
    }

    /// Encoded image bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed frame
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the underlying bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<Bytes> for Frame {
    type Error = Error;

    fn try_from(data: Bytes) -> Result<Self> {
        Self::new(data)
    }
}

impl TryFrom<Vec<u8>> for Frame {
    type Error = Error;

    fn try_from(data: Vec<u8>) -> Result<Self> {
        Self::new(data)
    }
}

/// Result of waiting on a [`FrameBuffer`](super::FrameBuffer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFrame {
    /// The newest frame and the generation it was published as
    Frame { frame: Frame, generation: u64 },
    /// The buffer was shut down; no more frames will arrive
    Closed,
}

impl NextFrame {
    /// Whether this is the end-of-stream marker
    pub fn is_closed(&self) -> bool {
        matches!(self, NextFrame::Closed)
    }

    /// Generation of the carried frame, if any
    pub fn generation(&self) -> Option<u64> {
        match self {
            NextFrame::Frame { generation, .. } => Some(*generation),
            NextFrame::Closed => None,
        }
    }
}
