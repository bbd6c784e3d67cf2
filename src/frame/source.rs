//! Boundary to the external capture pipeline.
//!
//! # Responsibilities
//! - Define what a frame source hands the gateway (encoded bytes + format)
//! - Drive a source at the configured capture rate and publish into the cache
//!
//! # Design Decisions
//! - Capture is blocking platform work, so the producer runs on its own OS
//!   thread and never shares an executor with connection handlers
//! - A failed capture skips the tick; the next tick tries again

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::schema::clamp_capture_fps;
use crate::frame::{FrameCache, ImageFormat};

/// Error returned by a [`FrameSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Encoded image bytes produced by a source.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Arc<[u8]>,
    pub format: ImageFormat,
}

/// Something that can produce encoded snapshots on demand.
///
/// `Ok(None)` means "nothing new this tick" and leaves the cache untouched.
pub trait FrameSource: Send + 'static {
    fn capture(&mut self) -> Result<Option<EncodedImage>, SourceError>;
}

/// Serves the same image file on every capture.
#[derive(Debug)]
pub struct StaticImageSource {
    image: EncodedImage,
}

impl StaticImageSource {
    /// Read `path` once. The format comes from the extension, JPEG if unknown.
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let data = std::fs::read(path)?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
            .unwrap_or_default();
        Ok(Self::from_bytes(data, format))
    }

    pub fn from_bytes(data: impl Into<Arc<[u8]>>, format: ImageFormat) -> Self {
        Self {
            image: EncodedImage {
                data: data.into(),
                format,
            },
        }
    }
}

impl FrameSource for StaticImageSource {
    fn capture(&mut self) -> Result<Option<EncodedImage>, SourceError> {
        Ok(Some(self.image.clone()))
    }
}

/// Runs a [`FrameSource`] on a dedicated thread.
pub struct FrameProducer;

impl FrameProducer {
    /// Start capturing at `capture_fps` (clamped to [1, 60]) into `cache`.
    pub fn spawn<S: FrameSource>(mut source: S, cache: FrameCache, capture_fps: u32) -> std::io::Result<ProducerHandle> {
        let fps = clamp_capture_fps(capture_fps);
        let period = Duration::from_secs_f64(1.0 / fps as f64);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || {
                tracing::info!(capture_fps = fps, "Frame producer started");
                while flag.load(Ordering::Relaxed) {
                    let tick = Instant::now();
                    match source.capture() {
                        Ok(Some(image)) => {
                            cache.publish(image.data, image.format);
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "Frame capture failed"),
                    }
                    if let Some(rest) = period.checked_sub(tick.elapsed()) {
                        thread::sleep(rest);
                    }
                }
                tracing::info!("Frame producer stopped");
            })?;

        Ok(ProducerHandle {
            running,
            thread: Some(thread),
        })
    }
}

/// Handle to a running producer. Dropping it stops the producer.
pub struct ProducerHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ProducerHandle {
    /// Ask the producer to stop and wait for its current tick to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Frame producer thread panicked");
            }
        }
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
