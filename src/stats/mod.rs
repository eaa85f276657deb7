//! Session and server statistics

pub mod metrics;

pub use metrics::{ConnectionGuard, ServerMetrics, ServerStats, SessionGuard, SessionStats};
