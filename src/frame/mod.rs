//! Frame storage subsystem.
//!
//! # Data Flow
//! ```text
//! external capture pipeline
//!     → source.rs (FrameSource trait, producer thread at capture fps)
//!     → cache.rs  (FrameCache::store / publish, single slot, latest wins)
//!
//! connection handlers (any number, any time)
//!     → cache.rs  (FrameCache::load → Arc<Frame> snapshot)
//! ```
//!
//! # Design Decisions
//! - A Frame is immutable once built; its bytes live behind an `Arc`
//! - The slot swap is a single atomic pointer replace, so readers never
//!   observe a half-written frame and the producer never waits on readers
//! - No queue: frames a reader did not load are simply never observed

pub mod cache;
pub mod source;
pub mod value;

pub use cache::FrameCache;
pub use value::{Frame, ImageFormat};
pub use source::{EncodedImage, FrameProducer, FrameSource, ProducerHandle, SourceError, StaticImageSource};
