// SPDX-License-Identifier: MPL-2.0-only

//! Bounded output queue between the player and whoever renders its frames.
//!
//! ```text
//! ┌─────────────┐
//! │ Player      │
//! │ process()   │
//! └─────┬───────┘
//!       │ push() - drops oldest if full
//!       ▼
//! ┌─────────────┐
//! │ Frame Queue │  ← bounded, capacity follows the buffer-size mode
//! └─────┬───────┘
//!       │ get_render_frame() - reuses last frame if empty
//!       ▼
//! ┌─────────────┐
//! │ Host        │
//! └─────────────┘
//! ```
//!
//! # Key Guarantees
//!
//! - **Consumer never blocks**: returns immediately, reuses last frame if empty
//! - **Producer never blocks**: drops the oldest frame if the queue is full
//! - **Resizable**: shrinking the capacity discards the oldest queued frames

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Default number of frames to buffer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 3;

/// Smallest capacity a queue can be given.
pub const MIN_QUEUE_CAPACITY: usize = 2;

/// A decoded video frame.
#[derive(Clone)]
pub struct QueuedFrame {
    /// Packed pixel data (BGRx).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Presentation timestamp (nanoseconds from stream start).
    pub pts_ns: Option<u64>,
    /// When this frame was created.
    pub queued_at: Instant,
}

impl QueuedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, pts_ns: Option<u64>) -> Self {
        Self {
            data,
            width,
            height,
            pts_ns,
            queued_at: Instant::now(),
        }
    }

    /// Copy this frame into a destination buffer.
    ///
    /// Returns the number of bytes written, or 0 if the buffer is too small.
    pub fn write_to(&self, dest: &mut [u8]) -> usize {
        let frame_size = self.data.len();
        if dest.len() < frame_size {
            return 0;
        }
        dest[..frame_size].copy_from_slice(&self.data);
        frame_size
    }
}

impl std::fmt::Debug for QueuedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedFrame")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pts_ns", &self.pts_ns)
            .finish()
    }
}

/// Statistics about frame queue operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total frames pushed to the queue.
    pub frames_pushed: u64,
    /// Frames dropped because the queue was full or shrunk.
    pub frames_dropped_full: u64,
    /// Frames popped by the consumer.
    pub frames_popped: u64,
    /// Times the consumer reused the last frame (queue was empty).
    pub frames_reused: u64,
}

/// A bounded, thread-safe frame queue.
///
/// Single producer (the player), single consumer (the host's renderer).
pub struct FrameQueue {
    frames: Mutex<VecDeque<QueuedFrame>>,
    capacity: AtomicUsize,
    /// Last frame handed to the consumer, reused when the queue runs dry.
    last_frame: Mutex<Option<QueuedFrame>>,
    /// Set when the source is closed.
    stopped: AtomicBool,
    stats_pushed: AtomicU64,
    stats_dropped: AtomicU64,
    stats_popped: AtomicU64,
    stats_reused: AtomicU64,
}

impl FrameQueue {
    /// Create a new frame queue with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_QUEUE_CAPACITY);

        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: AtomicUsize::new(capacity),
            last_frame: Mutex::new(None),
            stopped: AtomicBool::new(false),
            stats_pushed: AtomicU64::new(0),
            stats_dropped: AtomicU64::new(0),
            stats_popped: AtomicU64::new(0),
            stats_reused: AtomicU64::new(0),
        }
    }

    /// Push a frame (producer side).
    ///
    /// If the queue is full the oldest frame is dropped to make room.
    /// Returns `false` if the queue is stopped.
    pub fn push(&self, frame: QueuedFrame) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }

        let Ok(mut frames) = self.frames.lock() else {
            return false;
        };

        let capacity = self.capacity.load(Ordering::Acquire);
        while frames.len() >= capacity {
            if let Some(dropped) = frames.pop_front() {
                self.stats_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    pts_ns = ?dropped.pts_ns,
                    age_ms = dropped.queued_at.elapsed().as_millis(),
                    "Frame dropped: queue full"
                );
            }
        }

        frames.push_back(frame);
        self.stats_pushed.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Try to pop a frame (consumer side). Never blocks.
    pub fn try_pop(&self) -> Option<QueuedFrame> {
        let frame = self.frames.try_lock().ok()?.pop_front()?;
        self.stats_popped.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut last) = self.last_frame.try_lock() {
            *last = Some(frame.clone());
        }

        Some(frame)
    }

    /// Get a frame for rendering: pops from the queue, falls back to the last frame.
    ///
    /// Returns `None` only if no frame has ever been popped.
    pub fn get_render_frame(&self) -> Option<QueuedFrame> {
        if let Some(frame) = self.try_pop() {
            return Some(frame);
        }

        self.stats_reused.fetch_add(1, Ordering::Relaxed);
        self.last_frame.try_lock().ok()?.clone()
    }

    /// Copy the render frame into `dest`, returning its dimensions.
    pub fn write_frame_to(&self, dest: &mut [u8]) -> Option<(u32, u32)> {
        let frame = self.get_render_frame()?;

        if frame.write_to(dest) > 0 {
            Some((frame.width, frame.height))
        } else {
            None
        }
    }

    /// Dimensions of the last frame handed to the consumer.
    pub fn last_frame_dimensions(&self) -> Option<(u32, u32)> {
        self.last_frame
            .try_lock()
            .ok()?
            .as_ref()
            .map(|f| (f.width, f.height))
    }

    /// Change the capacity, dropping the oldest frames if it shrinks.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(MIN_QUEUE_CAPACITY);
        let Ok(mut frames) = self.frames.lock() else {
            return;
        };

        self.capacity.store(capacity, Ordering::Release);
        while frames.len() > capacity {
            frames.pop_front();
            self.stats_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Refuse further frames until [`reset`](Self::reset).
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Discard every queued frame, including the cached last frame, and accept pushes again.
    pub fn reset(&self) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.clear();
        }
        if let Ok(mut last) = self.last_frame.lock() {
            *last = None;
        }
        self.stopped.store(false, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            frames_pushed: self.stats_pushed.load(Ordering::Relaxed),
            frames_dropped_full: self.stats_dropped.load(Ordering::Relaxed),
            frames_popped: self.stats_popped.load(Ordering::Relaxed),
            frames_reused: self.stats_reused.load(Ordering::Relaxed),
        }
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Shared handle to a frame queue.
pub type SharedFrameQueue = Arc<FrameQueue>;

pub fn new_shared_queue(capacity: usize) -> SharedFrameQueue {
    Arc::new(FrameQueue::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pts: u64) -> QueuedFrame {
        QueuedFrame::new(vec![pts as u8], 1, 1, Some(pts))
    }

    #[test]
    fn test_basic_push_pop() {
        let queue = FrameQueue::new(3);

        assert!(queue.push(QueuedFrame::new(vec![1, 2, 3, 4], 1, 1, None)));
        assert_eq!(queue.len(), 1);

        let popped = queue.try_pop().unwrap();
        assert_eq!(popped.data, vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_has_floor() {
        assert_eq!(FrameQueue::new(0).capacity(), MIN_QUEUE_CAPACITY);
    }

    #[test]
    fn test_queue_full_drops_oldest() {
        let queue = FrameQueue::new(2);

        queue.push(frame(1));
        queue.push(frame(2));
        queue.push(frame(3));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop().unwrap().pts_ns, Some(2));
        assert_eq!(queue.try_pop().unwrap().pts_ns, Some(3));
    }

    #[test]
    fn test_get_render_frame_reuses_last() {
        let queue = FrameQueue::new(2);
        queue.push(frame(7));

        assert_eq!(queue.get_render_frame().unwrap().pts_ns, Some(7));
        assert!(queue.is_empty());
        assert_eq!(queue.get_render_frame().unwrap().pts_ns, Some(7));
        assert_eq!(queue.stats().frames_reused, 1);
        assert_eq!(queue.last_frame_dimensions(), Some((1, 1)));
    }

    #[test]
    fn test_shrinking_drops_oldest() {
        let queue = FrameQueue::new(6);
        for pts in 0..6 {
            queue.push(frame(pts));
        }

        queue.set_capacity(2);
        assert_eq!(queue.capacity(), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().pts_ns, Some(4));
        assert_eq!(queue.stats().frames_dropped_full, 4);
    }

    #[test]
    fn test_growing_keeps_frames() {
        let queue = FrameQueue::new(2);
        queue.push(frame(0));
        queue.push(frame(1));

        queue.set_capacity(4);
        queue.push(frame(2));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.stats().frames_dropped_full, 0);
    }

    #[test]
    fn test_stop_prevents_push_and_reset_clears() {
        let queue = FrameQueue::new(2);
        queue.push(frame(1));
        queue.get_render_frame();
        queue.push(frame(2));

        queue.stop();
        assert!(queue.is_stopped());
        assert!(!queue.push(frame(3)));
        assert_eq!(queue.len(), 1);

        queue.reset();
        assert!(!queue.is_stopped());
        assert!(queue.is_empty());
        assert!(queue.get_render_frame().is_none());
    }

    #[test]
    fn test_write_frame_to_buffer() {
        let queue = FrameQueue::new(2);
        queue.push(QueuedFrame::new(vec![1, 2, 3, 4], 1, 1, None));

        let mut small = [0u8; 2];
        assert_eq!(queue.write_frame_to(&mut small), None);

        let mut buffer = [0u8; 4];
        assert_eq!(queue.write_frame_to(&mut buffer), Some((1, 1)));
        assert_eq!(buffer, [1, 2, 3, 4]);
    }

    #[test]
    fn test_stats_tracking() {
        let queue = FrameQueue::new(2);

        queue.push(frame(1));
        queue.push(frame(2));
        queue.push(frame(3));
        queue.try_pop();
        queue.try_pop();
        queue.get_render_frame();

        assert_eq!(
            queue.stats(),
            QueueStats {
                frames_pushed: 3,
                frames_dropped_full: 1,
                frames_popped: 2,
                frames_reused: 1,
            }
        );
    }
}
