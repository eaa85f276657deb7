//! Streaming sessions
//!
//! One session per client on the stream route, each owned by the task
//! driving that connection.

pub mod stream;

pub use stream::{SessionOutcome, StreamSession};
