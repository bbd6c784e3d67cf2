//! TCP listener lifecycle.
//!
//! # Responsibilities
//! - Bind to the configured address on `start()`
//! - Accept connections and spawn one handler task per socket
//! - Track every live connection so `stop()` can cancel it
//! - Expose the Stopped / Starting / Running / Failed state machine
//!
//! # Design Decisions
//! - No connection ceiling: concurrency is bounded by the OS alone
//! - Bind failure is the only error surfaced to callers; it is not retried
//! - `stop()` closes the listening socket before cancelling connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::{finalize_config, ConfigError, GatewayConfig, ServerConfig};
use crate::frame::FrameCache;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::net::connection::{run_connection, ConnectionContext, ConnectionTracker};

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configured host and port do not form a socket address.
    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Listener state machine.
///
/// `Stopped → Starting → Running`, or `Starting → Failed` when the bind
/// fails; `Running → Stopped` on `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Starting,
    Running,
    Failed,
}

/// Resources that exist only while the listener runs.
struct RunningListener {
    local_addr: SocketAddr,
    accept_stop: Shutdown,
    connection_stop: Shutdown,
    accept_task: Option<JoinHandle<()>>,
}

impl Drop for RunningListener {
    fn drop(&mut self) {
        // Covers a gateway dropped without stop(); both triggers are idempotent.
        self.accept_stop.trigger();
        self.connection_stop.trigger();
    }
}

/// The frame-serving gateway: one listener, many short-lived connections.
///
/// The frame cache is injected at construction; the gateway only ever reads it.
pub struct FrameGateway {
    config: Arc<GatewayConfig>,
    cache: FrameCache,
    context: Arc<ConnectionContext>,
    tracker: ConnectionTracker,
    state: watch::Sender<ListenerState>,
    bound: ArcSwapOption<SocketAddr>,
    running: Mutex<Option<RunningListener>>,
}

impl FrameGateway {
    /// Build a stopped gateway.
    ///
    /// `config` is validated and its rates clamped here, so a route that
    /// cannot be embedded in the viewer page or a zero read bound never
    /// reaches a connection.
    pub fn new(config: GatewayConfig, cache: FrameCache) -> Result<Self, ConfigError> {
        let config = finalize_config(config)?;
        let context = Arc::new(ConnectionContext::from_config(&config, cache.clone()));
        let (state, _) = watch::channel(ListenerState::Stopped);
        Ok(Self {
            config: Arc::new(config),
            cache,
            context,
            tracker: ConnectionTracker::new(),
            state,
            bound: ArcSwapOption::empty(),
            running: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Port and clamped rates this gateway was built with.
    pub fn server_config(&self) -> ServerConfig {
        self.config.server()
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ListenerState::Running
    }

    /// Address actually bound, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.load_full().map(|addr| *addr)
    }

    /// Number of connections currently open.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    fn set_state(&self, state: ListenerState) {
        self.state.send_replace(state);
    }

    /// Bind and start accepting. A no-op returning the bound address if already running.
    pub async fn start(&self) -> Result<SocketAddr, GatewayError> {
        let mut running = self.running.lock().await;
        if let Some(listener) = running.as_ref() {
            return Ok(listener.local_addr);
        }

        self.set_state(ListenerState::Starting);
        let bind_address = self.config.listener.bind_address();
        let addr: SocketAddr = match bind_address.parse() {
            Ok(addr) => addr,
            Err(_) => {
                tracing::error!(address = %bind_address, "Invalid bind address");
                self.set_state(ListenerState::Failed);
                return Err(GatewayError::InvalidBindAddress(bind_address));
            }
        };

        let bound = TcpListener::bind(addr)
            .await
            .and_then(|listener| listener.local_addr().map(|local| (listener, local)));
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                tracing::error!(address = %addr, error = %source, "Failed to bind listener");
                self.set_state(ListenerState::Failed);
                return Err(GatewayError::Bind { addr, source });
            }
        };

        let accept_stop = Shutdown::new();
        let connection_stop = Shutdown::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            accept_stop.subscribe(),
            connection_stop.subscribe(),
            Arc::clone(&self.context),
            self.tracker.clone(),
        ));

        *running = Some(RunningListener {
            local_addr,
            accept_stop,
            connection_stop,
            accept_task: Some(accept_task),
        });
        self.bound.store(Some(Arc::new(local_addr)));
        self.set_state(ListenerState::Running);

        let server = self.server_config();
        tracing::info!(
            address = %local_addr,
            image_route = %self.config.viewer.image_route,
            refresh_fps = server.refresh_fps,
            capture_fps = server.capture_fps,
            "Gateway listening"
        );
        Ok(local_addr)
    }

    /// Stop accepting, cancel every live connection, then report Stopped.
    ///
    /// A no-op unless running.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(mut listener) = running.take() else {
            return;
        };

        listener.accept_stop.trigger();
        if let Some(task) = listener.accept_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Accept loop ended abnormally");
            }
        }
        self.bound.store(None);

        let open = self.tracker.active_count();
        listener.connection_stop.trigger();
        let timeout = Duration::from_millis(self.config.limits.stop_timeout_ms);
        if !self.tracker.wait_until_empty(timeout).await {
            let lingering = self.tracker.snapshot();
            tracing::warn!(remaining = lingering.len(), "Connections still closing after stop timeout");
            for (id, entry) in lingering {
                tracing::warn!(
                    connection_id = %id,
                    peer_addr = ?entry.peer_addr,
                    state = ?entry.state,
                    age_ms = entry.opened_at.elapsed().as_millis() as u64,
                    "Connection outlived stop"
                );
            }
        }
        drop(listener);

        self.set_state(ListenerState::Stopped);
        tracing::info!(cancelled_connections = open, "Gateway stopped");
    }
}

impl std::fmt::Debug for FrameGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGateway")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("active_connections", &self.active_connections())
            .finish()
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut stop: ShutdownSignal,
    cancel: ShutdownSignal,
    context: Arc<ConnectionContext>,
    tracker: ConnectionTracker,
) {
    loop {
        tokio::select! {
            _ = stop.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let guard = tracker.track(Some(peer_addr));
                    let span = tracing::debug_span!(
                        "connection",
                        connection_id = %guard.id(),
                        peer_addr = %peer_addr
                    );
                    tracing::debug!(parent: &span, active = tracker.active_count(), "Connection accepted");
                    tokio::spawn(
                        run_connection(stream, Arc::clone(&context), guard, cancel.clone()).instrument(span),
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },
        }
    }
    tracing::debug!("Accept loop stopped");
}
