//! Camera frame acquisition from named shared-memory segments
//!
//! A camera process writes pixels into a named segment and announces the frame
//! on the bus. The acquirer attaches to that segment, takes its lock, copies
//! exactly `width × height × bytes_per_pixel` bytes into a private buffer and
//! releases the lock as soon as the copy is done.
//!
//! ```text
//! FrameReady ──▶ attach(name) ──▶ is_valid? ──▶ lock ─ copy ─ unlock ──▶ SensorFrame
//!                    │                │
//!                    └── drop ◀───────┘
//! ```
//!
//! Any failure drops the frame: no retry and no error leaves this module.

use crate::core::types::SensorFrame;
use crate::error::{Error, Result};
use crate::streaming::messages::FrameNotification;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Scoped lock on a segment's bytes; the lock is released when it is dropped
pub type SegmentGuard<'a> = Box<dyn Deref<Target = [u8]> + 'a>;

/// A named inter-process buffer with its own lock
pub trait SharedMemory: Send + Sync {
    /// Segment handle
    fn name(&self) -> &str;

    /// Whether the producer still backs this segment
    fn is_valid(&self) -> bool;

    /// Size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Acquire the segment lock
    fn lock(&self) -> Result<SegmentGuard<'_>>;
}

/// Resolves segment names to attached segments
pub trait SharedMemoryFactory: Send + Sync {
    /// Attach to an existing segment, `None` if it does not exist
    fn attach(&self, name: &str) -> Option<Arc<dyn SharedMemory>>;
}

/// Shared-memory segment living inside this process
///
/// Used when the producer runs in the same process, and in tests. Producers in
/// other processes go through [`ShmDirectory`](super::ShmDirectory).
pub struct InProcessSegment {
    name: String,
    valid: AtomicBool,
    buffer: Mutex<Vec<u8>>,
    lock_count: AtomicU64,
}

impl InProcessSegment {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            valid: AtomicBool::new(true),
            buffer: Mutex::new(vec![0; size]),
            lock_count: AtomicU64::new(0),
        }
    }

    /// Producer side: overwrite the start of the segment
    ///
    /// Bytes beyond the segment size are ignored.
    pub fn write(&self, bytes: &[u8]) {
        let mut buffer = self.buffer.lock();
        let n = bytes.len().min(buffer.len());
        buffer[..n].copy_from_slice(&bytes[..n]);
    }

    /// Mark the segment as no longer backed by its producer
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Number of times the segment lock has been taken through [`SharedMemory::lock`]
    pub fn lock_count(&self) -> u64 {
        self.lock_count.load(Ordering::Relaxed)
    }
}

impl SharedMemory for InProcessSegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn size(&self) -> usize {
        self.buffer.lock().len()
    }

    fn lock(&self) -> Result<SegmentGuard<'_>> {
        self.lock_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MutexGuard::map(self.buffer.lock(), |v| v.as_mut_slice())))
    }
}

/// Registry of in-process segments addressable by name
#[derive(Default)]
pub struct SegmentRegistry {
    segments: RwLock<HashMap<String, Arc<InProcessSegment>>>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a segment of `size` bytes
    pub fn create(&self, name: &str, size: usize) -> Arc<InProcessSegment> {
        let segment = Arc::new(InProcessSegment::new(name, size));
        self.segments
            .write()
            .insert(name.to_string(), Arc::clone(&segment));
        segment
    }

    pub fn remove(&self, name: &str) -> Option<Arc<InProcessSegment>> {
        self.segments.write().remove(name)
    }

}

impl SharedMemoryFactory for SegmentRegistry {
    fn attach(&self, name: &str) -> Option<Arc<dyn SharedMemory>> {
        self.segments
            .read()
            .get(name)
            .map(|s| Arc::clone(s) as Arc<dyn SharedMemory>)
    }
}

/// Copies announced frames out of shared memory
pub struct FrameBufferAcquirer {
    factory: Arc<dyn SharedMemoryFactory>,
    acquired: u64,
    dropped: u64,
}

impl FrameBufferAcquirer {
    pub fn new(factory: Arc<dyn SharedMemoryFactory>) -> Self {
        Self {
            factory,
            acquired: 0,
            dropped: 0,
        }
    }

    /// Copy the announced frame, or drop it
    ///
    /// Returns `None` when the segment is missing, invalid, or smaller than the
    /// notification claims. The reason is logged at debug level only.
    pub fn acquire(&mut self, notification: &FrameNotification) -> Option<SensorFrame> {
        match self.try_acquire(notification) {
            Ok(frame) => {
                self.acquired += 1;
                Some(frame)
            }
            Err(e) => {
                self.dropped += 1;
                log::debug!(
                    "FrameBuffer: dropping frame from '{}': {}",
                    notification.source,
                    e
                );
                None
            }
        }
    }

    fn try_acquire(&self, notification: &FrameNotification) -> Result<SensorFrame> {
        let len = notification.byte_len().ok_or_else(|| {
            Error::TransientInput(format!(
                "invalid frame geometry {}x{}x{}",
                notification.width, notification.height, notification.bytes_per_pixel
            ))
        })?;

        let segment = self.factory.attach(&notification.segment).ok_or_else(|| {
            Error::TransientInput(format!("cannot attach to segment '{}'", notification.segment))
        })?;

        if !segment.is_valid() {
            return Err(Error::TransientInput(format!(
                "segment '{}' is invalid",
                notification.segment
            )));
        }

        let data = {
            let guard = segment.lock()?;
            if guard.len() < len {
                return Err(Error::TransientInput(format!(
                    "segment '{}' holds {} bytes, frame needs {}",
                    notification.segment,
                    guard.len(),
                    len
                )));
            }
            guard[..len].to_vec()
        };

        Ok(SensorFrame::new(
            data,
            notification.width,
            notification.height,
            notification.bytes_per_pixel,
            notification.source.clone(),
            notification.timestamp_us,
        ))
    }

    /// Acquisition statistics (acquired, dropped)
    pub fn get_stats(&self) -> (u64, u64) {
        (self.acquired, self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(segment: &str, width: u32, height: u32, bpp: u32) -> FrameNotification {
        FrameNotification {
            segment: segment.to_string(),
            width,
            height,
            bytes_per_pixel: bpp,
            source: "front-camera".to_string(),
            timestamp_us: 1_000,
        }
    }

    #[test]
    fn test_copies_exact_frame() {
        let registry = Arc::new(SegmentRegistry::new());
        let segment = registry.create("cam0", 64);
        let pixels: Vec<u8> = (0..64).collect();
        segment.write(&pixels);

        let mut acquirer = FrameBufferAcquirer::new(registry);
        let frame = acquirer.acquire(&notification("cam0", 4, 2, 3)).unwrap();

        assert_eq!(frame.len(), 24);
        assert_eq!(frame.data(), &pixels[..24]);
        assert_eq!(frame.channels, 3);
        assert_eq!(frame.source, "front-camera");
        assert_eq!(frame.timestamp_us, 1_000);
        assert_eq!(segment.lock_count(), 1);
        assert_eq!(acquirer.get_stats(), (1, 0));
    }

    #[test]
    fn test_frame_is_private_copy() {
        let registry = Arc::new(SegmentRegistry::new());
        let segment = registry.create("cam0", 4);
        segment.write(&[1, 2, 3, 4]);

        let mut acquirer = FrameBufferAcquirer::new(registry);
        let frame = acquirer.acquire(&notification("cam0", 2, 2, 1)).unwrap();
        segment.write(&[9, 9, 9, 9]);

        assert_eq!(frame.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_segment_is_not_copied() {
        let registry = Arc::new(SegmentRegistry::new());
        let segment = registry.create("cam0", 64);
        segment.invalidate();

        let mut acquirer = FrameBufferAcquirer::new(registry);
        assert!(acquirer.acquire(&notification("cam0", 4, 4, 1)).is_none());
        assert_eq!(segment.lock_count(), 0);
        assert_eq!(acquirer.get_stats(), (0, 1));
    }

    #[test]
    fn test_missing_segment_dropped() {
        let mut acquirer = FrameBufferAcquirer::new(Arc::new(SegmentRegistry::new()));
        assert!(acquirer.acquire(&notification("nope", 4, 4, 1)).is_none());
        assert_eq!(acquirer.get_stats(), (0, 1));
    }

    #[test]
    fn test_oversized_notification_dropped() {
        let registry = Arc::new(SegmentRegistry::new());
        let segment = registry.create("cam0", 16);

        let mut acquirer = FrameBufferAcquirer::new(registry);
        assert!(acquirer.acquire(&notification("cam0", 8, 8, 3)).is_none());
        assert!(acquirer.acquire(&notification("cam0", 0, 8, 3)).is_none());
        assert!(
            acquirer
                .acquire(&notification("cam0", u32::MAX, u32::MAX, u32::MAX))
                .is_none()
        );
        // Only the size check needed the lock
        assert_eq!(segment.lock_count(), 1);
        assert_eq!(acquirer.get_stats(), (0, 3));
    }

    #[test]
    fn test_lock_released_after_copy() {
        let registry = Arc::new(SegmentRegistry::new());
        let segment = registry.create("cam0", 8);

        let mut acquirer = FrameBufferAcquirer::new(registry);
        acquirer.acquire(&notification("cam0", 2, 2, 2)).unwrap();

        // Would deadlock if the acquirer still held the guard
        segment.write(&[7; 8]);
        assert_eq!(&**segment.lock().unwrap(), &[7; 8]);
    }
}
