//! Latest-frame HTTP gateway (v1)
//!
//! Serves the most recent screen snapshot to any number of browsers.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  FRAME GATEWAY                   │
//!                       │                                                  │
//!   Frame source        │  ┌──────────┐    ┌────────────┐                  │
//!   ────────────────────┼─▶│ producer │───▶│ FrameCache │ (single slot)    │
//!   (capture pipeline)  │  │  thread  │    └─────┬──────┘                  │
//!                       │  └──────────┘          │ load()                  │
//!                       │                        ▼                         │
//!   Browser request     │  ┌──────────┐    ┌────────────┐    ┌─────────┐   │
//!   ────────────────────┼─▶│   net    │───▶│    http    │───▶│ routing │   │
//!                       │  │ listener │    │  request   │    │ router  │   │
//!                       │  └──────────┘    └────────────┘    └────┬────┘   │
//!   Browser response    │  ┌──────────┐                           │        │
//!   ◀───────────────────┼──│ response │◀──────────────────────────┘        │
//!                       │  └──────────┘   viewer page | frame | 404        │
//!                       │                                                  │
//!                       │  config · lifecycle · observability              │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use frame_gateway::config::{finalize_config, read_config, ConfigError, GatewayConfig};
use frame_gateway::frame::{FrameProducer, StaticImageSource};
use frame_gateway::lifecycle::wait_for_stop_signal;
use frame_gateway::observability::{logging, metrics};
use frame_gateway::{FrameCache, FrameGateway};

#[derive(Parser, Debug)]
#[command(name = "frame-gateway")]
#[command(about = "Serve the latest screen snapshot to browsers over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "FRAME_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind
    #[arg(long, env = "FRAME_GATEWAY_BIND")]
    bind: Option<String>,

    /// TCP port to listen on
    #[arg(short, long, env = "FRAME_GATEWAY_PORT")]
    port: Option<u16>,

    /// Browser poll rate in frames per second (0.5 to 60)
    #[arg(long, env = "FRAME_GATEWAY_REFRESH_FPS")]
    refresh_fps: Option<f64>,

    /// Capture rate in frames per second (1 to 60)
    #[arg(long, env = "FRAME_GATEWAY_CAPTURE_FPS")]
    capture_fps: Option<u32>,

    /// Serve this image file as the frame source
    #[arg(long, env = "FRAME_GATEWAY_FRAME_FILE")]
    frame_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_host = bind.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(fps) = self.refresh_fps {
            config.viewer.refresh_fps = fps;
        }
        if let Some(fps) = self.capture_fps {
            config.capture.fps = fps;
        }
    }
}

/// File values, then CLI and environment overrides, validated once.
fn resolve_config(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);
    finalize_config(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                eprintln!("invalid configuration: {error}");
            }
            return Err(format!("{} configuration error(s)", errors.len()).into());
        }
        Err(e) => return Err(e.into()),
    };

    logging::init_logging(&config.observability.log_filter);
    tracing::info!("frame-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let cache = FrameCache::new();
    let producer = match &cli.frame_file {
        Some(path) => {
            let source = StaticImageSource::from_file(path)?;
            tracing::info!(path = %path.display(), "Serving static image");
            Some(FrameProducer::spawn(source, cache.clone(), config.capture.fps)?)
        }
        None => {
            tracing::info!("No frame source configured; image route returns 404 until frames are stored");
            None
        }
    };

    let gateway = FrameGateway::new(config, cache)?;
    gateway.start().await?;

    wait_for_stop_signal().await;

    gateway.stop().await;
    if let Some(producer) = producer {
        // Joining the producer thread blocks until its current capture ends.
        if let Err(e) = tokio::task::spawn_blocking(move || producer.stop()).await {
            tracing::error!(error = %e, "Frame producer did not stop cleanly");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("frame-gateway").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn bind_flag_replaces_bad_file_value_before_validation() {
        let path = std::env::temp_dir().join(format!("frame-gateway-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "[listener]\nbind_host = \"not-an-ip\"\nport = 7070\n").unwrap();
        let file = path.to_string_lossy().into_owned();

        let rejected = resolve_config(&cli(&["--config", &file]));
        let accepted = resolve_config(&cli(&["--config", &file, "--bind", "127.0.0.1"]));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(rejected, Err(ConfigError::Validation(_))));
        let config = accepted.unwrap();
        assert_eq!(config.listener.bind_address(), "127.0.0.1:7070");
    }

    #[test]
    fn overrides_are_clamped() {
        let config = resolve_config(&cli(&["--refresh-fps", "500", "--capture-fps", "0"])).unwrap();
        assert_eq!(config.viewer.refresh_fps, 60.0);
        assert_eq!(config.capture.fps, 1);
    }
}
