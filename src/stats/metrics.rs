//! Statistics for streaming sessions and the server

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Parts written to the client
    pub frames_sent: u64,
    /// Generations published while the session was busy and never delivered
    pub frames_skipped: u64,
    /// Bytes written, envelope included
    pub bytes_sent: u64,
    /// Last generation delivered
    pub last_generation: u64,
    /// Session start
    pub started_at: Instant,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            frames_sent: 0,
            frames_skipped: 0,
            bytes_sent: 0,
            last_generation: 0,
            started_at: Instant::now(),
        }
    }

    /// Record delivery of `generation`, counting the generations jumped over
    ///
    /// Frames published before the first delivery are not counted as skipped.
    pub fn record_frame(&mut self, generation: u64, bytes: usize) {
        if self.last_generation > 0 {
            self.frames_skipped += generation.saturating_sub(self.last_generation + 1);
        }
        self.last_generation = generation;
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record bytes that do not carry a frame
    pub fn record_bytes(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    /// Time since the session started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Delivered frames per second
    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }

    /// Average output bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of server-wide counters
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Connections accepted since start
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Connections turned away by the connection limit
    pub rejected_connections: u64,
    /// Streaming sessions currently running
    pub active_sessions: u64,
    /// Parts written across all finished sessions
    pub frames_sent: u64,
    /// Bytes written across all finished sessions
    pub bytes_sent: u64,
    /// Time since the server was created
    pub uptime: Duration,
}

/// Live server counters, shared between the accept loop and connection tasks
#[derive(Debug)]
pub struct ServerMetrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
    active_sessions: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    started_at: Instant,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Count an accepted connection; the guard marks it closed on drop
    pub fn connection_opened(self: &Arc<Self>) -> ConnectionGuard {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Count a connection turned away at the limit
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a running streaming session; the guard marks it finished on drop
    pub fn session_started(self: &Arc<Self>) -> SessionGuard {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Fold a finished session's totals into the server totals
    pub fn record_session(&self, stats: &SessionStats) {
        self.frames_sent.fetch_add(stats.frames_sent, Ordering::Relaxed);
        self.bytes_sent.fetch_add(stats.bytes_sent, Ordering::Relaxed);
    }

    /// Current number of streaming sessions
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Take a consistent-enough snapshot of all counters
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the open connection count when dropped
#[derive(Debug)]
pub struct ConnectionGuard {
    metrics: Arc<ServerMetrics>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Decrements the running session count when dropped
#[derive(Debug)]
pub struct SessionGuard {
    metrics: Arc<ServerMetrics>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.metrics.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.frames_sent, 0);
        assert_eq!(stats.frames_skipped, 0);
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.last_generation, 0);
    }

    #[test]
    fn test_session_stats_skips() {
        let mut stats = SessionStats::new();

        // Joined late: generations 1..=4 were never ours to miss
        stats.record_frame(5, 100);
        assert_eq!(stats.frames_skipped, 0);

        stats.record_frame(6, 100);
        assert_eq!(stats.frames_skipped, 0);

        stats.record_frame(9, 100);
        assert_eq!(stats.frames_skipped, 2);
        assert_eq!(stats.frames_sent, 3);
        assert_eq!(stats.bytes_sent, 300);
        assert_eq!(stats.last_generation, 9);
    }

    #[test]
    fn test_session_stats_rates_do_not_panic() {
        let mut stats = SessionStats::new();
        stats.record_bytes(1_000);

        assert!(stats.framerate() >= 0.0);
        let _ = stats.bitrate();
    }

    #[test]
    fn test_server_metrics_guards() {
        let metrics = Arc::new(ServerMetrics::new());

        let conn = metrics.connection_opened();
        let session = metrics.session_started();
        metrics.connection_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_connections, 1);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.active_sessions, 1);
        assert_eq!(snapshot.rejected_connections, 1);

        drop(session);
        drop(conn);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_connections, 1);
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(metrics.active_sessions(), 0);
    }

    #[test]
    fn test_record_session() {
        let metrics = ServerMetrics::new();
        let mut stats = SessionStats::new();
        stats.record_bytes(50);
        stats.record_frame(1, 200);

        metrics.record_session(&stats);
        metrics.record_session(&stats);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.bytes_sent, 500);
    }
}
