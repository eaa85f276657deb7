//! End-to-end tests against a server bound to an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mjpeg_relay::{Frame, FrameBuffer, MjpegServer, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    buffer: Arc<FrameBuffer>,
    server: Arc<MjpegServer>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<mjpeg_relay::Result<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let buffer = Arc::new(FrameBuffer::new());
        let server = Arc::new(MjpegServer::new(config, Arc::clone(&buffer)));
        let (tx, rx) = oneshot::channel::<()>();

        let handle = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server
                    .serve(listener, async {
                        let _ = rx.await;
                    })
                    .await
            })
        };

        Self {
            addr,
            buffer,
            server,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

fn test_config() -> ServerConfig {
    ServerConfig::default()
        .request_timeout(Duration::from_secs(2))
        .shutdown_grace(Duration::from_secs(2))
}

/// Send a raw request and read the whole response
async fn request(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    // A rejected connection may be reset after its response; keep what arrived
    let mut response = Vec::new();
    let _ = tokio::time::timeout(TIMEOUT, stream.read_to_end(&mut response))
        .await
        .expect("response not closed");
    String::from_utf8(response).unwrap()
}

/// Read lines up to and including the blank line that ends a header block
async fn read_header_block<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> String {
    let mut block = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        assert!(n > 0, "connection closed mid-headers: {block:?}");
        block.push_str(&line);
        if line == "\r\n" {
            return block;
        }
    }
}

async fn read_part<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Vec<u8> {
    let head = read_header_block(reader).await;
    assert!(head.starts_with("--FRAME\r\n"), "bad part head {head:?}");
    assert!(head.contains("Content-Type: image/jpeg\r\n"));

    let len: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .expect("part without Content-Length")
        .parse()
        .unwrap();

    let mut payload = vec![0u8; len + 2];
    reader.read_exact(&mut payload).await.unwrap();
    assert_eq!(&payload[len..], b"\r\n");
    payload.truncate(len);
    payload
}

async fn open_stream(addr: SocketAddr) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stream.mjpg HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();

    let mut reader = BufReader::new(stream);
    let head = tokio::time::timeout(TIMEOUT, read_header_block(&mut reader))
        .await
        .expect("no stream envelope");

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: multipart/x-mixed-replace; boundary=FRAME\r\n"));
    assert!(head.contains("Cache-Control: no-cache, private\r\n"));
    assert!(head.contains("Access-Control-Allow-Origin: *\r\n"));
    reader
}

#[tokio::test]
async fn test_stream_delivers_latest_frames_and_closes_on_shutdown() {
    let server = TestServer::start(test_config()).await;

    let mut first = open_stream(server.addr).await;
    let mut second = open_stream(server.addr).await;

    server.buffer.publish(Frame::from_static(b"\xFF\xD8frame-1\xFF\xD9").unwrap());
    for client in [&mut first, &mut second] {
        let payload = tokio::time::timeout(TIMEOUT, read_part(client)).await.unwrap();
        assert_eq!(payload, b"\xFF\xD8frame-1\xFF\xD9");
    }

    server.buffer.publish(Frame::from_static(b"\xFF\xD8frame-2\xFF\xD9").unwrap());
    let payload = tokio::time::timeout(TIMEOUT, read_part(&mut first)).await.unwrap();
    assert_eq!(payload, b"\xFF\xD8frame-2\xFF\xD9");

    // Shutdown ends both streams cleanly
    let buffer = Arc::clone(&server.buffer);
    server.stop().await;
    assert!(buffer.is_shut_down());

    for client in [&mut first, &mut second] {
        let mut rest = Vec::new();
        tokio::time::timeout(TIMEOUT, client.read_to_end(&mut rest))
            .await
            .expect("stream not closed")
            .unwrap();
    }
}

#[tokio::test]
async fn test_late_joiner_gets_current_frame() {
    let server = TestServer::start(test_config()).await;

    server.buffer.publish(Frame::from_static(b"old").unwrap());
    server.buffer.publish(Frame::from_static(b"current").unwrap());

    let mut client = open_stream(server.addr).await;
    let payload = tokio::time::timeout(TIMEOUT, read_part(&mut client)).await.unwrap();
    assert_eq!(payload, b"current");

    server.stop().await;
}

#[tokio::test]
async fn test_disconnected_client_is_released() {
    let server = TestServer::start(test_config()).await;

    let client = open_stream(server.addr).await;
    let mut other = open_stream(server.addr).await;

    // Wait until both sessions are counted
    tokio::time::timeout(TIMEOUT, async {
        while server.server.stats().active_sessions < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    drop(client);

    tokio::time::timeout(TIMEOUT, async {
        while server.server.stats().active_sessions > 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session for closed client still running");

    // The remaining client keeps streaming
    server.buffer.publish(Frame::from_static(b"still-here").unwrap());
    let payload = tokio::time::timeout(TIMEOUT, read_part(&mut other)).await.unwrap();
    assert_eq!(payload, b"still-here");

    server.stop().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start(test_config()).await;

    let response = request(server.addr, "GET /health HTTP/1.1\r\nHost: test\r\n\r\n").await;
    let (head, body) = response.split_once("\r\n\r\n").unwrap();

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: application/json\r\n"));
    assert!(head.contains("Access-Control-Allow-Origin: *\r\n"));

    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["camera"], "waiting");
    assert_eq!(json["generation"], 0);

    server.buffer.publish(Frame::from_static(b"x").unwrap());
    let response = request(server.addr, "GET /health HTTP/1.0\r\n\r\n").await;
    let (_, body) = response.split_once("\r\n\r\n").unwrap();
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["camera"], "active");
    assert_eq!(json["generation"], 1);

    server.stop().await;
}

#[tokio::test]
async fn test_simple_routes() {
    let server = TestServer::start(test_config()).await;
    let addr = server.addr;

    let redirect = request(addr, "GET / HTTP/1.1\r\n\r\n").await;
    assert!(redirect.starts_with("HTTP/1.1 301 Moved Permanently\r\n"));
    assert!(redirect.contains("Location: /stream.mjpg\r\n"));

    let missing = request(addr, "GET /nope HTTP/1.1\r\n\r\n").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

    let preflight = request(addr, "OPTIONS /stream.mjpg HTTP/1.1\r\n\r\n").await;
    assert!(preflight.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(preflight.contains("Access-Control-Allow-Methods: GET, HEAD, OPTIONS\r\n"));
    assert!(preflight.contains("Access-Control-Allow-Headers: Content-Type\r\n"));

    let head = request(addr, "HEAD /stream.mjpg HTTP/1.1\r\n\r\n").await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: multipart/x-mixed-replace; boundary=FRAME\r\n"));
    assert!(head.ends_with("\r\n\r\n"));

    let unsupported = request(addr, "POST /health HTTP/1.1\r\n\r\n").await;
    assert!(unsupported.starts_with("HTTP/1.1 501 Not Implemented\r\n"));

    let garbage = request(addr, "hello\r\n\r\n").await;
    assert!(garbage.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn test_connection_limit() {
    let server = TestServer::start(test_config().max_connections(1)).await;

    let mut held = open_stream(server.addr).await;

    let rejected = request(server.addr, "GET /health HTTP/1.1\r\n\r\n").await;
    assert!(rejected.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert_eq!(server.server.stats().rejected_connections, 1);

    server.buffer.publish(Frame::from_static(b"ok").unwrap());
    let payload = tokio::time::timeout(TIMEOUT, read_part(&mut held)).await.unwrap();
    assert_eq!(payload, b"ok");

    server.stop().await;
}
