//! Simple one-shot responses for the non-streaming routes

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// CORS headers attached to every response
pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    MovedPermanently,
    BadRequest,
    NotFound,
    NotImplemented,
    ServiceUnavailable,
}

impl Status {
    /// Numeric status code
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::MovedPermanently => 301,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::NotImplemented => 501,
            Status::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::MovedPermanently => "Moved Permanently",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::NotImplemented => "Not Implemented",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// A complete response written in one go, then the connection is closed
#[derive(Debug, Clone)]
pub struct Response {
    status: Status,
    headers: Vec<(&'static str, String)>,
    /// `None` for HEAD answers: headers only, no Content-Length
    body: Option<Bytes>,
}

impl Response {
    /// Start a response with the CORS headers already attached
    pub fn new(status: Status) -> Self {
        let headers = CORS_HEADERS
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();

        Self {
            status,
            headers,
            body: None,
        }
    }

    /// Add a header
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Attach a body with its content type
    pub fn body(self, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut response = self.header("Content-Type", content_type);
        response.body = Some(body.into());
        response
    }

    /// Headers-only answer to a HEAD request
    pub fn head(content_type: &str) -> Self {
        Self::new(Status::Ok).header("Content-Type", content_type)
    }

    /// JSON document
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(Status::Ok).body("application/json", body)
    }

    /// CORS preflight answer
    pub fn preflight() -> Self {
        let mut response = Self::new(Status::Ok);
        response.body = Some(Bytes::new());
        response
    }

    /// Permanent redirect
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(Status::MovedPermanently).header("Location", location);
        response.body = Some(Bytes::new());
        response
    }

    /// Error page for `status`
    pub fn error(status: Status) -> Self {
        let page = format!(
            "<html><body><h1>{} {}</h1></body></html>\n",
            status.code(),
            status.reason()
        );
        Self::new(status).body("text/html", page)
    }

    /// Response status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Serialize the response; `head_only` drops the body but keeps its headers
    pub fn encode(&self, head_only: bool, buf: &mut BytesMut) {
        buf.put_slice(b"HTTP/1.1 ");
        buf.put_slice(self.status.code().to_string().as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(self.status.reason().as_bytes());
        buf.put_slice(b"\r\n");

        for (name, value) in &self.headers {
            put_header(buf, name, value);
        }
        if let Some(ref body) = self.body {
            put_header(buf, "Content-Length", &body.len().to_string());
        }
        put_header(buf, "Connection", "close");
        buf.put_slice(b"\r\n");

        if let (false, Some(body)) = (head_only, &self.body) {
            buf.put_slice(body);
        }
    }

    /// Write the response and flush
    pub async fn write_to<W>(&self, writer: &mut W, head_only: bool) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(256);
        self.encode(head_only, &mut buf);
        writer.write_all(&buf).await?;
        writer.flush().await
    }
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}
