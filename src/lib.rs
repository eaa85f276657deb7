//! Live MJPEG distribution server
//!
//! One producer publishes encoded frames into a shared [`FrameBuffer`]; every
//! HTTP client on the stream route gets its own [`StreamSession`] that
//! writes the newest frame as a `multipart/x-mixed-replace` part. Slow
//! clients skip frames instead of slowing down the producer or each other.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mjpeg_relay::source::{spawn_producer, DirectorySource};
//! use mjpeg_relay::{FrameBuffer, MjpegServer, ServerConfig};
//!
//! # async fn example() -> mjpeg_relay::Result<()> {
//! let buffer = Arc::new(FrameBuffer::new());
//!
//! let source = DirectorySource::open("./frames").await?;
//! let producer = spawn_producer(source, Arc::clone(&buffer), Duration::from_millis(100));
//!
//! let server = MjpegServer::new(ServerConfig::default(), Arc::clone(&buffer));
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//! // The buffer is shut down by now, so the producer winds down too
//! let _ = producer.await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod error;
pub mod http;
pub mod multipart;
pub mod server;
pub mod session;
pub mod source;
pub mod stats;

pub use buffer::{Frame, FrameBuffer, NextFrame};
pub use error::{Error, Result};
pub use server::{MjpegServer, ServerConfig};
pub use session::{SessionOutcome, StreamSession};
