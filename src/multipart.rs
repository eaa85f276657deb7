//! `multipart/x-mixed-replace` framing
//!
//! Browsers render this natively: point an `<img>` at the stream route and
//! each part replaces the previous image.
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: multipart/x-mixed-replace; boundary=FRAME\r\n
//! ...\r\n
//! \r\n
//! --FRAME\r\n                      ┐
//! Content-Type: image/jpeg\r\n     │ one part
//! Content-Length: <n>\r\n          │ per frame
//! \r\n                             │
//! <n bytes of JPEG>\r\n            ┘
//! --FRAME\r\n
//! ...
//! ```
//!
//! Every part repeats its headers and carries its own `Content-Length`;
//! clients rely on that to delimit images.

use bytes::{BufMut, BytesMut};

use crate::buffer::Frame;
use crate::http::response::CORS_HEADERS;

/// Boundary token separating parts
pub const BOUNDARY: &str = "FRAME";

/// Response content type announcing the part stream
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=FRAME";

/// Content type of every part
pub const PART_CONTENT_TYPE: &str = "image/jpeg";

/// Response head sent once before the first part
const ENVELOPE_HEADERS: &[(&str, &str)] = &[
    ("Age", "0"),
    ("Cache-Control", "no-cache, private"),
    ("Pragma", "no-cache"),
    ("Content-Type", STREAM_CONTENT_TYPE),
    ("Connection", "close"),
];

/// Encode the status line and headers that open the stream
pub fn encode_envelope(buf: &mut BytesMut) {
    buf.put_slice(b"HTTP/1.1 200 OK\r\n");
    for (name, value) in CORS_HEADERS.iter().chain(ENVELOPE_HEADERS) {
        put_header(buf, name, value);
    }
    buf.put_slice(b"\r\n");
}

/// Encode one part carrying `frame`
pub fn encode_part(frame: &Frame, buf: &mut BytesMut) {
    buf.reserve(part_len(frame));

    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(b"\r\n");
    put_header(buf, "Content-Type", PART_CONTENT_TYPE);
    put_header(buf, "Content-Length", &frame.len().to_string());
    buf.put_slice(b"\r\n");
    buf.put_slice(frame.data());
    buf.put_slice(b"\r\n");
}

/// Exact encoded size of the part carrying `frame`
pub fn part_len(frame: &Frame) -> usize {
    let len_digits = frame.len().to_string().len();

    // "--" BOUNDARY CRLF
    2 + BOUNDARY.len() + 2
        // "Content-Type: " type CRLF
        + 14 + PART_CONTENT_TYPE.len() + 2
        // "Content-Length: " digits CRLF
        + 16 + len_digits + 2
        // CRLF, payload, CRLF
        + 2 + frame.len() + 2
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}
