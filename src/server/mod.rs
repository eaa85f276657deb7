//! HTTP server: accept loop, routing, and per-connection tasks

pub mod config;
mod connection;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT, DEFAULT_STREAM_PATH};
pub use listener::MjpegServer;
