//! Route table

use super::request::{Method, RequestHead};
use crate::multipart::STREAM_CONTENT_TYPE;

/// Path of the health check endpoint
pub const HEALTH_PATH: &str = "/health";

/// What to do with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Hand the connection to a streaming session
    Stream,
    /// JSON health report
    Health,
    /// Redirect `/` to the stream path
    Redirect,
    /// HEAD probe: headers only, with the content type the GET would carry
    Head { content_type: &'static str },
    /// CORS preflight
    Preflight,
    NotFound,
    NotImplemented,
}

impl Route {
    /// Resolve a request against the configured stream path
    pub fn resolve(head: &RequestHead, stream_path: &str) -> Self {
        let path = head.path.as_str();

        match head.method {
            Method::Options => Route::Preflight,
            Method::Head => {
                let content_type = if path == stream_path {
                    STREAM_CONTENT_TYPE
                } else if path == HEALTH_PATH {
                    "application/json"
                } else {
                    "text/html"
                };
                Route::Head { content_type }
            }
            Method::Get if path == stream_path => Route::Stream,
            Method::Get if path == "/" => Route::Redirect,
            Method::Get if path == HEALTH_PATH => Route::Health,
            Method::Get => Route::NotFound,
            Method::Other(_) => Route::NotImplemented,
        }
    }

    /// Whether this route keeps the connection open for streaming
    pub fn is_stream(&self) -> bool {
        matches!(self, Route::Stream)
    }
}
