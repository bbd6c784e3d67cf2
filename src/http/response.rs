//! Response framing.
//!
//! # Responsibilities
//! - Build the three response kinds (viewer page, frame image, not found)
//! - Serialize status line and headers with an exact Content-Length
//! - Write header and body to the socket
//!
//! # Design Decisions
//! - Every response carries `Connection: close`
//! - Frame bodies are written straight from the shared frame bytes, no copy

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::frame::Frame;

pub const CACHE_DISABLED: &str = "no-cache, no-store, must-revalidate";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// Status codes this gateway emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// Response payload.
#[derive(Debug, Clone)]
pub enum Body {
    Static(&'static str),
    Shared(Arc<str>),
    Frame(Arc<Frame>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Static(text) => text.as_bytes(),
            Body::Shared(text) => text.as_bytes(),
            Body::Frame(frame) => frame.data(),
        }
    }
}

/// A complete HTTP/1.1 response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: Status,
    pub content_type: &'static str,
    pub cache_control: Option<&'static str>,
    pub body: Body,
}

impl HttpResponse {
    /// 200 with the viewer page.
    pub fn html(page: Arc<str>) -> Self {
        Self {
            status: Status::Ok,
            content_type: HTML_CONTENT_TYPE,
            cache_control: None,
            body: Body::Shared(page),
        }
    }

    /// 200 with the frame bytes; caching disabled so every poll refetches.
    pub fn image(frame: Arc<Frame>) -> Self {
        Self {
            status: Status::Ok,
            content_type: frame.format().content_type(),
            cache_control: Some(CACHE_DISABLED),
            body: Body::Frame(frame),
        }
    }

    /// 404 used when no frame has been stored yet.
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: TEXT_CONTENT_TYPE,
            cache_control: None,
            body: Body::Static(NOT_FOUND_BODY),
        }
    }

    pub fn body_len(&self) -> usize {
        self.body.as_bytes().len()
    }

    /// Status line and headers, terminated by the blank line.
    pub fn head(&self) -> String {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body_len(),
        );
        if let Some(cache_control) = self.cache_control {
            head.push_str("Cache-Control: ");
            head.push_str(cache_control);
            head.push_str("\r\n");
        }
        head.push_str("Connection: close\r\n\r\n");
        head
    }

    /// Write head and body, then flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(self.head().as_bytes()).await?;
        writer.write_all(self.body.as_bytes()).await?;
        writer.flush().await
    }
}
