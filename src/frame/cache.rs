//! Single-slot, latest-wins frame cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;

use crate::frame::{Frame, ImageFormat};
use crate::observability::metrics;

/// Holds zero or one [`Frame`].
///
/// Cloning the cache hands out another handle to the same slot. Both
/// `store` and `load` are wait-free with respect to each other: the slot is
/// an atomically swapped `Arc`, so a reader that loaded a frame keeps that
/// exact frame alive until it drops the handle, regardless of later stores.
#[derive(Clone)]
pub struct FrameCache {
    slot: Arc<ArcSwapOption<Frame>>,
    next_sequence: Arc<AtomicU64>,
    notify: Arc<watch::Sender<Option<u64>>>,
}

impl FrameCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
            next_sequence: Arc::new(AtomicU64::new(1)),
            notify: Arc::new(tx),
        }
    }

    /// Replace whatever frame is held. Most recent store wins.
    pub fn store(&self, frame: Frame) {
        let sequence = frame.sequence();
        let size = frame.len();
        self.slot.store(Some(Arc::new(frame)));
        // send_replace never fails and never waits, even with no receivers.
        self.notify.send_replace(Some(sequence));
        metrics::record_frame_stored(size);
        tracing::trace!(sequence, bytes = size, "Frame stored");
    }

    /// Stamp `data` with the next sequence number and the current time, then store it.
    ///
    /// Returns the assigned sequence number.
    pub fn publish(&self, data: impl Into<Arc<[u8]>>, format: ImageFormat) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.store(Frame::with_format(data, sequence, format));
        sequence
    }

    /// Snapshot of the held frame, or `None` if nothing was ever stored.
    pub fn load(&self) -> Option<Arc<Frame>> {
        self.slot.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }

    /// Receiver that observes the sequence number of every store.
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.notify.subscribe()
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("frame", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn empty_until_first_store() {
        let cache = FrameCache::new();
        assert!(cache.is_empty());
        assert!(cache.load().is_none());
    }

    #[test]
    fn latest_store_wins() {
        let cache = FrameCache::new();
        cache.store(Frame::new(vec![1u8; 16], 1));
        cache.store(Frame::new(vec![2u8; 8], 2));

        let frame = cache.load().unwrap();
        assert_eq!(frame.sequence(), 2);
        assert_eq!(frame.data(), &[2u8; 8][..]);
    }

    #[test]
    fn loaded_snapshot_survives_later_store() {
        let cache = FrameCache::new();
        cache.store(Frame::new(vec![7u8; 4], 1));
        let held = cache.load().unwrap();

        cache.store(Frame::new(vec![9u8; 4], 2));

        assert_eq!(held.data(), &[7u8; 4][..]);
        assert_eq!(cache.load().unwrap().data(), &[9u8; 4][..]);
    }

    #[test]
    fn publish_assigns_increasing_sequences() {
        let cache = FrameCache::new();
        let a = cache.publish(vec![1u8], ImageFormat::Jpeg);
        let b = cache.publish(vec![2u8], ImageFormat::Png);
        assert!(b > a);

        let frame = cache.load().unwrap();
        assert_eq!(frame.sequence(), b);
        assert_eq!(frame.format(), ImageFormat::Png);
    }

    #[test]
    fn subscribers_see_latest_sequence() {
        let cache = FrameCache::new();
        let rx = cache.subscribe();
        assert_eq!(*rx.borrow(), None);

        cache.store(Frame::new(vec![0u8], 41));
        cache.store(Frame::new(vec![0u8], 42));
        assert_eq!(*rx.borrow(), Some(42));
    }

    #[test]
    fn concurrent_loads_never_see_mixed_bytes() {
        let cache = FrameCache::new();
        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    // Every byte of a frame carries the same value.
                    let fill = (i % 251) as u8;
                    cache.store(Frame::new(vec![fill; 1024 + (i as usize % 64)], i as u64));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        if let Some(frame) = cache.load() {
                            let first = frame.data()[0];
                            assert!(frame.data().iter().all(|b| *b == first));
                            assert_eq!(frame.len(), 1024 + (frame.sequence() as usize % 64));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
