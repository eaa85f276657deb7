//! Request head parsing
//!
//! Only the request line and headers are read; none of the routes take a body.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

/// Upper bound on the size of a request head
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Request method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Options,
    /// Anything else, kept verbatim for logging
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            other => Method::Other(other.to_string()),
        }
    }

    /// Method name as sent on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed request line and headers
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method
    pub method: Method,
    /// Path with any query string removed
    pub path: String,
    /// Protocol version, e.g. "HTTP/1.1"
    pub version: String,
    /// Header fields in arrival order
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Parse a complete head (request line, headers, blank line)
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| Error::BadRequest("head is not UTF-8"))?;
        let mut lines = text.split("\r\n").flat_map(|l| l.split('\n'));

        let request_line = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or(Error::BadRequest("missing request line"))?;

        let mut parts = request_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v), None) => (m, t, v),
            _ => return Err(Error::BadRequest("malformed request line")),
        };

        if !version.starts_with("HTTP/") {
            return Err(Error::BadRequest("unsupported protocol"));
        }

        let path = target.split('?').next().unwrap_or(target);
        if !path.starts_with('/') {
            return Err(Error::BadRequest("request target is not a path"));
        }

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or(Error::BadRequest("malformed header line"))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            method: Method::parse(method),
            path: path.to_string(),
            version: version.to_string(),
            headers,
        })
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read a request head from `reader`
///
/// Stops at the first blank line. Fails with [`Error::HeadTooLarge`] if no
/// blank line appears within [`MAX_HEAD_SIZE`] bytes.
pub async fn read_head<R>(reader: &mut R) -> Result<RequestHead>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_HEAD_SIZE as u64);
    let mut raw = Vec::with_capacity(512);

    loop {
        let start = raw.len();
        let n = limited.read_until(b'\n', &mut raw).await?;

        if n == 0 || !raw.ends_with(b"\n") {
            if limited.limit() == 0 {
                return Err(Error::HeadTooLarge(MAX_HEAD_SIZE));
            }
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }

        let line = &raw[start..];
        if line == b"\r\n" || line == b"\n" {
            // Tolerate stray blank lines before the request line
            if start == 0 {
                raw.clear();
                continue;
            }
            break;
        }
    }

    RequestHead::parse(&raw)
}
