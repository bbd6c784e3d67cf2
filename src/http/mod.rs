//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! bytes read by net/connection.rs
//!     → request.rs (request line → method, path or Malformed)
//!     → [routing layer picks viewer page / frame / 404]
//!     → viewer.rs (page body, rendered once per gateway)
//!     → response.rs (status line, headers, body)
//!     → Send to client, close
//! ```

pub mod request;
pub mod response;
pub mod viewer;

pub use request::{has_header_end, has_request_line, parse_request, ParsedRequest, RequestLine};
pub use response::{Body, HttpResponse, Status};
pub use viewer::{poll_interval_ms, render_viewer_page};
