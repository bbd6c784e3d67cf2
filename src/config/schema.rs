//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Lowest and highest browser poll rate, in frames per second.
pub const MIN_REFRESH_FPS: f64 = 0.5;
pub const MAX_REFRESH_FPS: f64 = 60.0;

/// Lowest and highest capture rate, in frames per second.
pub const MIN_CAPTURE_FPS: u32 = 1;
pub const MAX_CAPTURE_FPS: u32 = 60;

const DEFAULT_REFRESH_FPS: f64 = 10.0;
const DEFAULT_CAPTURE_FPS: u32 = 10;

/// Clamp a browser poll rate into [0.5, 60]. Non-finite input yields the default.
pub fn clamp_refresh_fps(fps: f64) -> f64 {
    if fps.is_finite() {
        fps.clamp(MIN_REFRESH_FPS, MAX_REFRESH_FPS)
    } else {
        DEFAULT_REFRESH_FPS
    }
}

/// Clamp a capture rate into [1, 60].
pub fn clamp_capture_fps(fps: u32) -> u32 {
    fps.clamp(MIN_CAPTURE_FPS, MAX_CAPTURE_FPS)
}

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Viewer page settings.
    pub viewer: ViewerConfig,

    /// Capture settings for the frame producer.
    pub capture: CaptureConfig,

    /// Per-connection limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Return a copy with every rate clamped into its legal range.
    pub fn clamped(mut self) -> Self {
        self.viewer.refresh_fps = clamp_refresh_fps(self.viewer.refresh_fps);
        self.capture.fps = clamp_capture_fps(self.capture.fps);
        self
    }

    /// The three values the gateway is started with.
    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            port: self.listener.port,
            refresh_fps: clamp_refresh_fps(self.viewer.refresh_fps),
            capture_fps: clamp_capture_fps(self.capture.fps),
        }
    }
}

/// Clamped startup values: port, browser poll rate and advertised capture rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub refresh_fps: f64,
    /// Informational only; the gateway never enforces it.
    pub capture_fps: u32,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port. 0 lets the OS choose.
    pub port: u16,
}

impl ListenerConfig {
    /// "host:port" string used for binding and logging.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Viewer page configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// How often the page polls for a new image.
    pub refresh_fps: f64,

    /// Path prefix that serves the current frame.
    pub image_route: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh_fps: DEFAULT_REFRESH_FPS,
            image_route: "/shot.jpg".to_string(),
        }
    }
}

/// Capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames per second requested from the frame source.
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

/// Per-connection limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request bytes read before parsing.
    pub max_request_bytes: usize,

    /// Time allowed to receive a complete request line.
    pub read_timeout_ms: u64,

    /// Time allowed to write the whole response.
    pub write_timeout_ms: u64,

    /// Longest `stop()` waits for cancelled connections to close.
    pub stop_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 8 * 1024,
            read_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
            stop_timeout_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub log_filter: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "frame_gateway=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
