//! MJPEG server fed from a directory of JPEG files
//!
//! Run with: cargo run --example mjpeg_server -- --frames <DIR> [OPTIONS]
//!
//! Examples:
//!   cargo run --example mjpeg_server -- --frames ./frames                  # binds to 0.0.0.0:8000
//!   cargo run --example mjpeg_server -- --frames ./frames --bind localhost # binds to 127.0.0.1:8000
//!   cargo run --example mjpeg_server -- --frames ./frames --fps 30 --bind 0.0.0.0:8080
//!
//! ## Watching the stream
//!
//! Browser:
//!   <img src="http://localhost:8000/stream.mjpg">
//!
//! With ffplay:
//!   ffplay http://localhost:8000/stream.mjpg
//!
//! Health check:
//!   curl http://localhost:8000/health

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mjpeg_relay::server::DEFAULT_PORT;
use mjpeg_relay::source::{spawn_producer, DirectorySource};
use mjpeg_relay::{FrameBuffer, MjpegServer, ServerConfig};

/// Serve a looping JPEG sequence as a live MJPEG stream
#[derive(Debug, Parser)]
#[command(name = "mjpeg_server")]
struct Args {
    /// Directory of .jpg/.jpeg files, played in file name order
    #[arg(long)]
    frames: PathBuf,

    /// Address to bind to: IP:PORT, IP, or localhost
    #[arg(long, default_value = "0.0.0.0:8000", value_parser = parse_bind_addr)]
    bind: SocketAddr,

    /// Frames published per second
    #[arg(long, default_value_t = 10.0)]
    fps: f64,

    /// Route of the multipart stream
    #[arg(long, default_value = "/stream.mjpg")]
    stream_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Seconds a client may stall a single part before it is dropped (0 = never)
    #[arg(long, default_value_t = 30)]
    write_timeout: u64,
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8000
/// - "localhost:8080" -> 127.0.0.1:8080
/// - "127.0.0.1" -> 127.0.0.1:8000
/// - "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_relay=debug".parse()?)
                .add_directive("mjpeg_server=debug".parse()?),
        )
        .init();

    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(format!("--fps must be positive, got {}", args.fps).into());
    }

    let write_timeout = match args.write_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let config = ServerConfig::default()
        .bind(args.bind)
        .stream_path(args.stream_path)
        .max_connections(args.max_connections)
        .write_timeout(write_timeout);

    let buffer = Arc::new(FrameBuffer::new());

    let source = DirectorySource::open(&args.frames).await?;
    let producer = spawn_producer(
        source,
        Arc::clone(&buffer),
        Duration::from_secs_f64(1.0 / args.fps),
    );

    tracing::info!(
        stream = %format!("http://{}{}", config.bind_addr, config.stream_path),
        health = %format!("http://{}/health", config.bind_addr),
        "Press Ctrl+C to stop"
    );

    let server = MjpegServer::new(config, Arc::clone(&buffer));
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    // run_until shut the buffer down, so the producer stops at its next tick
    match producer.await {
        Ok(Ok(frames)) => tracing::info!(frames = frames, "Producer stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Producer failed"),
        Err(e) => tracing::error!(error = %e, "Producer task failed"),
    }

    let stats = server.stats();
    tracing::info!(
        connections = stats.total_connections,
        frames_sent = stats.frames_sent,
        bytes_sent = stats.bytes_sent,
        uptime_secs = stats.uptime.as_secs(),
        "Server stopped"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr("localhost").unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("localhost:8080").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("0.0.0.0:9000").unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("not an address").is_err());
    }
}
