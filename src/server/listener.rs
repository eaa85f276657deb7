//! MJPEG server listener
//!
//! Handles the TCP accept loop and spawns one task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::buffer::FrameBuffer;
use crate::error::Result;
use crate::http::{Response, Status};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::{ServerMetrics, ServerStats};

/// MJPEG streaming server
///
/// Serves the frames published into a shared [`FrameBuffer`] to any number
/// of HTTP clients.
pub struct MjpegServer {
    config: Arc<ServerConfig>,
    buffer: Arc<FrameBuffer>,
    metrics: Arc<ServerMetrics>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl MjpegServer {
    /// Create a new server streaming from `buffer`
    pub fn new(config: ServerConfig, buffer: Arc<FrameBuffer>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            buffer,
            metrics: Arc::new(ServerMetrics::new()),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// The frame buffer this server streams from
    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Snapshot of the server counters
    pub fn stats(&self) -> ServerStats {
        self.metrics.snapshot()
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server until the process exits
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` resolves the listener is closed, the frame buffer is
    /// shut down so every session ends its stream, and sessions get
    /// `shutdown_grace` to finish before they are aborted.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Like [`run_until`](Self::run_until), on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            stream_path = %self.config.stream_path,
            "MJPEG server listening"
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(socket, peer_addr, &mut connections);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                }
            }
        }

        drop(listener);
        self.buffer.shutdown();
        self.drain(connections).await;

        Ok(())
    }

    /// Wait for connection tasks to wind down, then abort the stragglers
    async fn drain(&self, mut connections: JoinSet<()>) {
        let remaining = connections.len();
        if remaining == 0 {
            return;
        }
        tracing::debug!(connections = remaining, "Waiting for connections to close");

        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while let Some(joined) = connections.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                connections = connections.len(),
                "Aborting connections still open after grace period"
            );
            connections.shutdown().await;
        }
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        connections: &mut JoinSet<()>,
    ) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    self.metrics.connection_rejected();
                    connections.spawn(reject(socket));
                    return;
                }
            }
        } else {
            None
        };

        // Generate session ID
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        // Configure socket
        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let guard = self.metrics.connection_opened();
        let connection = Connection::new(
            session_id,
            peer_addr,
            Arc::clone(&self.config),
            Arc::clone(&self.buffer),
            Arc::clone(&self.metrics),
        );

        connections.spawn(async move {
            let _permit = permit;
            let _guard = guard;

            if let Err(e) = connection.run(socket).await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

/// Answer a connection over the limit with 503 and close it
async fn reject(mut socket: TcpStream) {
    let response = Response::error(Status::ServiceUnavailable);
    if let Err(e) = response.write_to(&mut socket, false).await {
        tracing::trace!(error = %e, "Failed to send rejection");
        return;
    }
    let _ = socket.shutdown().await;
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}
