//! Minimal request-line parsing.
//!
//! # Responsibilities
//! - Decide when enough bytes have arrived to route (request line, header end)
//! - Extract method and path from the first line
//!
//! # Design Decisions
//! - Headers and bodies are never parsed; routing needs only the path
//! - Never fails: anything unusable becomes `ParsedRequest::Malformed`

/// Method and path from a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
}

/// Result of parsing the bytes received on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRequest {
    Request(RequestLine),
    Malformed,
}

impl ParsedRequest {
    /// Path to route on, if the request was well formed.
    pub fn path(&self) -> Option<&str> {
        match self {
            ParsedRequest::Request(line) => Some(&line.path),
            ParsedRequest::Malformed => None,
        }
    }
}

/// True once `buf` holds a complete request line.
pub fn has_request_line(buf: &[u8]) -> bool {
    buf.contains(&b'\n')
}

/// True once `buf` holds the blank line that ends the header block.
pub fn has_header_end(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.windows(2).any(|w| w == b"\n\n")
}

/// Parse the first line of `buf` into method and path.
///
/// The line ends at the first `\n` (an optional preceding `\r` is dropped) or
/// at the end of the buffer. At least two space-separated tokens are required.
pub fn parse_request(buf: &[u8]) -> ParsedRequest {
    let line = match buf.iter().position(|b| *b == b'\n') {
        Some(end) => &buf[..end],
        None => buf,
    };
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = String::from_utf8_lossy(line);

    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(method), Some(path)) => ParsedRequest::Request(RequestLine {
            method: method.to_string(),
            path: path.to_string(),
        }),
        _ => ParsedRequest::Malformed,
    }
}
