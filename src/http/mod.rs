//! Minimal HTTP/1.x handling
//!
//! Just enough to accept a request, pick a route, and either answer it in
//! one write or hand the socket to a streaming session. Connections are not
//! kept alive.

pub mod health;
pub mod request;
pub mod response;
pub mod router;

pub use health::{CameraState, HealthReport};
pub use request::{read_head, Method, RequestHead, MAX_HEAD_SIZE};
pub use response::{Response, Status, CORS_HEADERS};
pub use router::{Route, HEALTH_PATH};
