//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Accepted → Reading → Parsed → Responding → Closed)
//! - Generate unique connection IDs for tracing
//! - Own one socket end to end: read, parse, route, write, close
//! - Keep the live-connection set that `stop()` cancels

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::GatewayConfig;
use crate::frame::FrameCache;
use crate::http::{has_header_end, has_request_line, parse_request};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::ResponseRouter;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

const READ_CHUNK: usize = 1024;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, handler not yet reading.
    Accepted,
    /// Waiting for the request line.
    Reading,
    /// Request parsed (or judged malformed).
    Parsed,
    /// Writing the response.
    Responding,
    /// Socket closed.
    Closed,
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Responded,
    PeerClosed,
    ReadTimedOut,
    ReadFailed,
    WriteFailed,
    WriteTimedOut,
    Cancelled,
}

impl ConnectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionOutcome::Responded => "responded",
            ConnectionOutcome::PeerClosed => "peer_closed",
            ConnectionOutcome::ReadTimedOut => "read_timeout",
            ConnectionOutcome::ReadFailed => "read_failed",
            ConnectionOutcome::WriteFailed => "write_failed",
            ConnectionOutcome::WriteTimedOut => "write_timeout",
            ConnectionOutcome::Cancelled => "cancelled",
        }
    }
}

/// What the tracker knows about one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub peer_addr: Option<SocketAddr>,
    pub state: ConnectionState,
    pub opened_at: Instant,
}

/// The live-connection set.
///
/// Entries are inserted by [`ConnectionTracker::track`] and removed when the
/// returned guard drops, which happens exactly once per connection whatever
/// path the handler took.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    live: Arc<DashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Returns a guard that removes it on drop.
    pub fn track(&self, peer_addr: Option<SocketAddr>) -> ConnectionGuard {
        let id = ConnectionId::new();
        self.live.insert(
            id,
            ConnectionEntry {
                peer_addr,
                state: ConnectionState::Accepted,
                opened_at: Instant::now(),
            },
        );
        metrics::record_connection_opened();
        ConnectionGuard {
            live: Arc::clone(&self.live),
            id,
        }
    }

    /// Get current live connection count.
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    /// Copy of every live entry, for diagnostics.
    pub fn snapshot(&self) -> Vec<(ConnectionId, ConnectionEntry)> {
        self.live
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Current state of a live connection, `None` once it has closed.
    pub fn state_of(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.live.get(&id).map(|entry| entry.state)
    }

    /// Wait until every tracked connection has closed or `timeout` elapses.
    ///
    /// Returns true if the set drained.
    pub async fn wait_until_empty(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.live.is_empty() {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

/// Guard that tracks a connection's lifetime.
/// Removes the connection from the live set when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<DashMap<ConnectionId, ConnectionEntry>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn set_state(&self, state: ConnectionState) {
        if let Some(mut entry) = self.live.get_mut(&self.id) {
            entry.state = state;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.live.remove(&self.id).is_some() {
            metrics::record_connection_closed();
        }
        tracing::trace!(connection_id = %self.id, state = ?ConnectionState::Closed, "Connection closed");
    }
}

/// Everything a handler needs; shared read-only by all connections.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub router: ResponseRouter,
    pub max_request_bytes: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ConnectionContext {
    pub fn from_config(config: &GatewayConfig, cache: FrameCache) -> Self {
        Self {
            router: ResponseRouter::from_config(config, cache),
            max_request_bytes: config.limits.max_request_bytes,
            read_timeout: Duration::from_millis(config.limits.read_timeout_ms),
            write_timeout: Duration::from_millis(config.limits.write_timeout_ms),
        }
    }
}

/// Read until the header block ends, the byte bound is hit, or the peer half-closes.
async fn read_request<R>(reader: &mut R, buf: &mut Vec<u8>, max_bytes: usize) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    while buf.len() < max_bytes && !has_header_end(buf) {
        let want = chunk.len().min(max_bytes - buf.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}

/// Serve one request on `stream`, then close it by dropping it.
///
/// The read is bounded by `read_timeout`. If the timeout fires after a
/// request line arrived the request is still answered; otherwise the
/// connection closes with no response.
pub async fn handle_connection<S>(mut stream: S, ctx: &ConnectionContext, guard: &ConnectionGuard) -> ConnectionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    guard.set_state(ConnectionState::Reading);

    let mut buf = Vec::with_capacity(READ_CHUNK);
    let read = tokio::time::timeout(ctx.read_timeout, read_request(&mut stream, &mut buf, ctx.max_request_bytes)).await;
    match read {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Read failed");
            return ConnectionOutcome::ReadFailed;
        }
        Err(_) if has_request_line(&buf) => {}
        Err(_) => return ConnectionOutcome::ReadTimedOut,
    }
    if buf.is_empty() {
        return ConnectionOutcome::PeerClosed;
    }

    let request = parse_request(&buf);
    guard.set_state(ConnectionState::Parsed);

    let (route, response) = ctx.router.route(&request);
    tracing::debug!(
        path = request.path().unwrap_or("<malformed>"),
        route = route.as_str(),
        status = response.status.code(),
        bytes = response.body_len(),
        "Routing request"
    );

    guard.set_state(ConnectionState::Responding);
    let write = async {
        response.write_to(&mut stream).await?;
        stream.shutdown().await
    };
    match tokio::time::timeout(ctx.write_timeout, write).await {
        Ok(Ok(())) => {
            metrics::record_request(route.as_str(), response.status.code(), response.body_len());
            ConnectionOutcome::Responded
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Write failed");
            ConnectionOutcome::WriteFailed
        }
        Err(_) => ConnectionOutcome::WriteTimedOut,
    }
}

/// Run a tracked connection until it finishes or `cancel` fires.
///
/// Dropping the handler future on cancellation drops the socket, so the
/// socket is closed exactly once either way.
pub async fn run_connection<S>(stream: S, ctx: Arc<ConnectionContext>, guard: ConnectionGuard, mut cancel: ShutdownSignal)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = tokio::select! {
        outcome = handle_connection(stream, &ctx, &guard) => outcome,
        _ = cancel.recv() => ConnectionOutcome::Cancelled,
    };
    metrics::record_connection_outcome(outcome.as_str());
    tracing::debug!(connection_id = %guard.id(), outcome = outcome.as_str(), "Connection finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::lifecycle::Shutdown;
    use tokio::io::duplex;

    fn context(cache: FrameCache) -> ConnectionContext {
        let mut config = GatewayConfig::default();
        config.viewer.refresh_fps = 5.0;
        config.limits.read_timeout_ms = 200;
        config.limits.write_timeout_ms = 200;
        ConnectionContext::from_config(&config, cache)
    }

    async fn exchange(ctx: &ConnectionContext, request: &[u8]) -> (ConnectionOutcome, Vec<u8>) {
        let tracker = ConnectionTracker::new();
        let (mut client, server) = duplex(64 * 1024);
        client.write_all(request).await.unwrap();

        let guard = tracker.track(None);
        let outcome = handle_connection(server, ctx, &guard).await;
        drop(guard);
        assert_eq!(tracker.active_count(), 0);

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        (outcome, out)
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track(None);
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.state_of(guard1.id()), Some(ConnectionState::Accepted));

        let guard2 = tracker.track(None);
        guard2.set_state(ConnectionState::Responding);
        assert_eq!(tracker.state_of(guard2.id()), Some(ConnectionState::Responding));
        assert_eq!(tracker.active_count(), 2);

        let id1 = guard1.id();
        drop(guard1);
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.state_of(id1), None);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn snapshot_reports_peer_state_and_age() {
        let tracker = ConnectionTracker::new();
        let peer: SocketAddr = "192.0.2.7:4242".parse().unwrap();
        let before = Instant::now();
        let guard = tracker.track(Some(peer));
        guard.set_state(ConnectionState::Reading);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 1);
        let (id, entry) = &snapshot[0];
        assert_eq!(*id, guard.id());
        assert_eq!(entry.peer_addr, Some(peer));
        assert_eq!(entry.state, ConnectionState::Reading);
        assert!(entry.opened_at >= before);

        drop(guard);
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn wait_until_empty_times_out_while_held() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track(None);
        assert!(!tracker.wait_until_empty(Duration::from_millis(30)).await);
        drop(guard);
        assert!(tracker.wait_until_empty(Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn serves_frame_bytes() {
        let cache = FrameCache::new();
        cache.store(Frame::new(vec![0xFF, 0xD8, 0xD9], 1));
        let (outcome, out) = exchange(&context(cache), b"GET /shot.jpg HTTP/1.1\r\nHost: x\r\n\r\n").await;

        assert_eq!(outcome, ConnectionOutcome::Responded);
        let head_end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let head = std::str::from_utf8(&out[..head_end]).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: image/jpeg\r\n"));
        assert!(head.contains("Content-Length: 3\r\n"));
        assert_eq!(&out[head_end..], &[0xFF, 0xD8, 0xD9]);
    }

    #[tokio::test]
    async fn empty_cache_is_404() {
        let (outcome, out) = exchange(&context(FrameCache::new()), b"GET /shot.jpg?t=5 HTTP/1.1\r\n\r\n").await;
        assert_eq!(outcome, ConnectionOutcome::Responded);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("\r\n\r\n404 Not Found"));
    }

    #[tokio::test]
    async fn malformed_request_gets_viewer() {
        let (outcome, out) = exchange(&context(FrameCache::new()), b"garbage\r\n\r\n").await;
        assert_eq!(outcome, ConnectionOutcome::Responded);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.contains("const intervalMs = 200;"));
    }

    #[tokio::test]
    async fn request_line_without_header_end_is_answered_after_timeout() {
        let (outcome, out) = exchange(&context(FrameCache::new()), b"GET / HTTP/1.1\r\n").await;
        assert_eq!(outcome, ConnectionOutcome::Responded);
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn idle_connection_closes_without_response() {
        let (outcome, out) = exchange(&context(FrameCache::new()), b"GET /sho").await;
        assert_eq!(outcome, ConnectionOutcome::ReadTimedOut);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn peer_close_before_any_bytes() {
        let ctx = context(FrameCache::new());
        let tracker = ConnectionTracker::new();
        let (client, server) = duplex(1024);
        drop(client);

        let guard = tracker.track(None);
        assert_eq!(handle_connection(server, &ctx, &guard).await, ConnectionOutcome::PeerClosed);
    }

    #[tokio::test]
    async fn byte_bound_stops_reading() {
        let mut config = GatewayConfig::default();
        config.limits.max_request_bytes = 16;
        config.limits.read_timeout_ms = 5_000;
        let ctx = ConnectionContext::from_config(&config, FrameCache::new());

        let mut request = b"GET /a-very-long-path".to_vec();
        request.extend(std::iter::repeat(b'a').take(4096));
        let (outcome, out) = exchange(&ctx, &request).await;

        // 16 bytes "GET /a-very-long" still yields method and path.
        assert_eq!(outcome, ConnectionOutcome::Responded);
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn stalled_reader_hits_write_timeout() {
        let cache = FrameCache::new();
        cache.store(Frame::new(vec![0xAB; 64 * 1024], 1));
        let ctx = context(cache);
        let tracker = ConnectionTracker::new();
        // 15 bytes fit the 16-byte pipe; the frame does not.
        let (mut client, server) = duplex(16);
        client.write_all(b"GET /shot.jpg\n\n").await.unwrap();

        let guard = tracker.track(None);
        let outcome = handle_connection(server, &ctx, &guard).await;
        assert_eq!(outcome, ConnectionOutcome::WriteTimedOut);

        drop(guard);
        assert_eq!(tracker.active_count(), 0);
        drop(client);
    }

    #[tokio::test]
    async fn vanished_client_is_a_write_failure() {
        let cache = FrameCache::new();
        cache.store(Frame::new(vec![0xAB; 4096], 1));
        let ctx = context(cache);
        let tracker = ConnectionTracker::new();
        let (mut client, server) = duplex(1024);
        client.write_all(b"GET /shot.jpg HTTP/1.1\r\n\r\n").await.unwrap();
        drop(client);

        let guard = tracker.track(None);
        let outcome = handle_connection(server, &ctx, &guard).await;
        assert_eq!(outcome, ConnectionOutcome::WriteFailed);

        drop(guard);
        assert_eq!(tracker.active_count(), 0);

        // The same context keeps serving the next client.
        let (outcome, out) = exchange(&ctx, b"GET /shot.jpg HTTP/1.1\r\n\r\n").await;
        assert_eq!(outcome, ConnectionOutcome::Responded);
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn cancellation_closes_and_untracks() {
        let ctx = Arc::new(context(FrameCache::new()));
        let tracker = ConnectionTracker::new();
        let shutdown = Shutdown::new();
        let (mut client, server) = duplex(1024);

        let mut ctx_slow = (*ctx).clone();
        ctx_slow.read_timeout = Duration::from_secs(30);
        let task = tokio::spawn(run_connection(server, Arc::new(ctx_slow), tracker.track(None), shutdown.subscribe()));

        assert_eq!(tracker.active_count(), 1);
        shutdown.trigger();
        task.await.unwrap();

        assert_eq!(tracker.active_count(), 0);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
