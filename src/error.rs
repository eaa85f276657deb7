//! Error types
//!
//! Client I/O failures inside a streaming session are not surfaced through
//! this type; sessions report them as a [`SessionOutcome`](crate::session::SessionOutcome).

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame with no payload was offered for publishing
    #[error("frame payload is empty")]
    EmptyFrame,

    /// A frame directory contained no usable images
    #[error("no JPEG frames found in {}", .0.display())]
    NoFrames(PathBuf),

    /// The request head could not be parsed
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// The request head exceeded the configured limit
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
}

impl Error {
    /// Whether this error was caused by the remote peer going away
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => is_disconnect(e),
            _ => false,
        }
    }
}

/// Whether an I/O error means the client hung up
pub(crate) fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero
    )
}
