//! Bounded ring of decoded frames between the tick and polling contexts.
//!
//! This is the only state shared across the interrupt/mainline boundary
//! once a frame has been validated: the tick path is the single producer,
//! the application's poll is the single consumer, and access is serialized
//! by the caller (in `timer-isr` builds, the critical section that guards
//! the whole driver).
//!
//! Overflow applies back-pressure instead of evicting: a frame that
//! completes while the ring is full is dropped and counted, and the missing
//! acknowledgment forces the sender to retry later.

use crate::consts::MAX_FRAME;
use crate::frame::Frame;
use core::fmt;
use heapless::Deque;

/// FIFO ring of up to [`MAX_FRAME`] fully decoded, CRC-validated frames.
pub struct FrameBuffer {
    frames: Deque<Frame, MAX_FRAME>,
    /// Frames dropped because the ring was full when they completed.
    pub dropped: u16,
}

impl FrameBuffer {
    /// Creates an empty ring.
    pub const fn new() -> Self {
        Self {
            frames: Deque::new(),
            dropped: 0,
        }
    }

    /// Enqueues a completed frame; drops it (and counts the drop) when the
    /// ring is full. Returns whether the frame was accepted.
    pub fn push(&mut self, frame: Frame) -> bool {
        if self.frames.push_back(frame).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        true
    }

    /// Dequeues the oldest undelivered frame, if any.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Number of frames waiting for pickup.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are waiting.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.frames.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameType;

    fn frame(sender: u8) -> Frame {
        let mut f = Frame::new(1, sender, FrameType::State);
        f.seal();
        f
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = FrameBuffer::new();
        assert!(ring.is_empty());
        assert!(ring.push(frame(10)));
        assert!(ring.push(frame(11)));
        assert_eq!(ring.pop().unwrap().sender, 10);
        assert_eq!(ring.pop().unwrap().sender, 11);
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_overflow_drops_newcomer_and_preserves_buffered() {
        let mut ring = FrameBuffer::new();
        assert!(ring.push(frame(1)));
        assert!(ring.push(frame(2)));
        // full: the new frame is dropped, not the oldest undelivered one
        assert!(!ring.push(frame(3)));
        assert_eq!(ring.dropped, 1);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop().unwrap().sender, 1);
        assert_eq!(ring.pop().unwrap().sender, 2);
        // draining frees a slot again
        assert!(ring.push(frame(4)));
        assert_eq!(ring.pop().unwrap().sender, 4);
    }
}
