//! Per-connection handling
//!
//! Reads one request head, then either answers it in a single response or
//! turns the connection into a streaming session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::buffer::FrameBuffer;
use crate::error::{Error, Result};
use crate::http::{read_head, HealthReport, Method, Response, Route, Status};
use crate::server::config::ServerConfig;
use crate::session::StreamSession;
use crate::stats::ServerMetrics;

/// One accepted client connection
pub(crate) struct Connection {
    session_id: u64,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    buffer: Arc<FrameBuffer>,
    metrics: Arc<ServerMetrics>,
}

impl Connection {
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        config: Arc<ServerConfig>,
        buffer: Arc<FrameBuffer>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            session_id,
            peer_addr,
            config,
            buffer,
            metrics,
        }
    }

    /// Serve the connection to completion
    pub async fn run(&self, socket: TcpStream) -> Result<()> {
        let (read_half, mut write_half) = socket.into_split();
        let mut reader = BufReader::new(read_half);

        let head = match tokio::time::timeout(self.config.request_timeout, read_head(&mut reader)).await {
            Ok(Ok(head)) => head,
            Ok(Err(e @ (Error::BadRequest(_) | Error::HeadTooLarge(_)))) => {
                tracing::debug!(
                    session_id = self.session_id,
                    peer = %self.peer_addr,
                    error = %e,
                    "Rejected malformed request"
                );
                Response::error(Status::BadRequest)
                    .write_to(&mut write_half, false)
                    .await?;
                return Ok(());
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::debug!(
                    session_id = self.session_id,
                    peer = %self.peer_addr,
                    "Request head timed out"
                );
                return Ok(());
            }
        };

        let route = Route::resolve(&head, &self.config.stream_path);

        // Stream requests are long-lived and frequent; keep them out of the info log
        if route.is_stream() {
            tracing::debug!(
                session_id = self.session_id,
                peer = %self.peer_addr,
                method = %head.method,
                path = %head.path,
                "Request"
            );
        } else {
            tracing::info!(
                session_id = self.session_id,
                peer = %self.peer_addr,
                method = %head.method,
                path = %head.path,
                "Request"
            );
        }

        let response = match route {
            Route::Stream => {
                self.stream(reader, write_half).await;
                return Ok(());
            }
            Route::Health => {
                let report = HealthReport::collect(&self.buffer, &self.metrics.snapshot());
                Response::json(report.to_json())
            }
            Route::Redirect => Response::redirect(&self.config.stream_path),
            Route::Head { content_type } => Response::head(content_type),
            Route::Preflight => Response::preflight(),
            Route::NotFound => Response::error(Status::NotFound),
            Route::NotImplemented => Response::error(Status::NotImplemented),
        };

        response
            .write_to(&mut write_half, head.method == Method::Head)
            .await?;
        write_half.shutdown().await?;

        Ok(())
    }

    /// Run a streaming session until it ends or the client hangs up
    async fn stream(&self, mut reader: BufReader<OwnedReadHalf>, writer: OwnedWriteHalf) {
        let _session = self.metrics.session_started();

        let mut session = StreamSession::new(self.session_id, Arc::clone(&self.buffer), writer)
            .write_timeout(self.config.write_timeout);

        let hung_up = tokio::select! {
            _ = session.run() => false,
            _ = wait_for_hangup(&mut reader) => true,
        };

        if hung_up {
            tracing::debug!(
                session_id = self.session_id,
                peer = %self.peer_addr,
                frames = session.stats().frames_sent,
                "Streaming client hung up"
            );
        }

        self.metrics.record_session(session.stats());
    }
}

/// Resolve once the peer closes its side of the connection
async fn wait_for_hangup<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 512];
    loop {
        match reader.read(&mut scratch).await {
            Ok(0) | Err(_) => return,
            // Anything pipelined after the stream request is ignored
            Ok(_) => {}
        }
    }
}
