//! Encoded frame value type.

use std::sync::Arc;
use std::time::SystemTime;

/// Encoding of the bytes held by a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// MIME type sent in the image response.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// One already-encoded image snapshot.
///
/// The bytes are shared, never copied, between the cache and every reader
/// that loaded this frame. There is no way to mutate them after construction.
#[derive(Clone)]
pub struct Frame {
    data: Arc<[u8]>,
    sequence: u64,
    captured_at: SystemTime,
    format: ImageFormat,
}

impl Frame {
    /// Build a JPEG frame stamped with the current time.
    pub fn new(data: impl Into<Arc<[u8]>>, sequence: u64) -> Self {
        Self::with_format(data, sequence, ImageFormat::Jpeg)
    }

    /// Build a frame of the given format stamped with the current time.
    pub fn with_format(data: impl Into<Arc<[u8]>>, sequence: u64, format: ImageFormat) -> Self {
        Self {
            data: data.into(),
            sequence,
            captured_at: SystemTime::now(),
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("format", &self.format)
            .field("size", &self.data.len())
            .finish()
    }
}
