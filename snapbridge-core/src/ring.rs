//! Lock-free byte queue between the UART producer and the poll loop
//!
//! # Memory ordering
//!
//! Exactly one context pushes and exactly one context pops. The producer
//! owns `head`, the consumer owns `tail`. A slot is written before `head`
//! is published with `Release`, and the consumer reads `head` with
//! `Acquire` before touching the slot, so a popped byte is always the byte
//! that was pushed. The same pairing runs the other way on `tail` so the
//! producer never overwrites a slot the consumer has not finished reading.
//!
//! Only load/store atomics are used; thumbv6m provides those natively.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity single-producer/single-consumer byte queue
///
/// A queue of capacity `N` holds at most `N - 1` bytes. When full, new
/// bytes are dropped and unread bytes are never overwritten.
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    /// Next slot to write (producer side)
    head: AtomicUsize,
    /// Next slot to read (consumer side)
    tail: AtomicUsize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_CHECK: () = assert!(N >= 2, "ring buffer needs at least two slots");

    /// Create an empty queue
    ///
    /// `const` so the queue can live in a `static` shared with an
    /// interrupt handler.
    pub const fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Append a byte (producer side)
    ///
    /// Returns false and drops the byte if the queue is full.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        self.slots[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    /// Remove the oldest byte (consumer side)
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.slots[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(byte)
    }

    /// Check whether unread bytes are queued
    pub fn has_data(&self) -> bool {
        self.head.load(Ordering::Acquire) != self.tail.load(Ordering::Acquire)
    }

    /// Number of unread bytes
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Check whether the queue is empty
    pub fn is_empty(&self) -> bool {
        !self.has_data()
    }

    /// Maximum number of bytes the queue can hold
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Discard everything by rewinding both indices to zero
    ///
    /// Only call this while the producer is quiescent (between frames, or
    /// with the serial interrupt disabled). A push racing with a reset may
    /// be lost.
    pub fn reset(&self) {
        self.tail.store(0, Ordering::Release);
        self.head.store(0, Ordering::Release);
    }
}

/// Receive path shared between the UART producer and the frame receiver
///
/// Bundles the byte queue with the time the last byte arrived, which the
/// receiver uses to detect a stalled frame.
pub struct SerialInbox<const N: usize> {
    ring: RingBuffer<N>,
    last_activity_ms: AtomicU32,
    active: AtomicBool,
}

impl<const N: usize> Default for SerialInbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SerialInbox<N> {
    /// Create an empty inbox
    pub const fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            last_activity_ms: AtomicU32::new(0),
            active: AtomicBool::new(false),
        }
    }

    /// Deliver a received byte (producer side)
    ///
    /// O(1) and non-blocking; safe to call from an interrupt handler.
    /// Returns false if the byte was dropped because the queue is full.
    pub fn deliver(&self, byte: u8, now_ms: u32) -> bool {
        self.last_activity_ms.store(now_ms, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
        self.ring.push(byte)
    }

    /// Arrival time of the most recent byte since the last reset
    pub fn last_activity(&self) -> Option<u32> {
        if self.active.load(Ordering::Acquire) {
            Some(self.last_activity_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Consumer access to the byte queue
    pub fn ring(&self) -> &RingBuffer<N> {
        &self.ring
    }

    /// Clear the queue and the activity stamp
    pub fn reset(&self) {
        self.ring.reset();
        self.active.store(false, Ordering::Release);
        self.last_activity_ms.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_pop_fifo() {
        let ring: RingBuffer<8> = RingBuffer::new();
        assert!(!ring.has_data());

        for b in [1u8, 2, 3] {
            assert!(ring.push(b));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_capacity_is_n_minus_one() {
        let ring: RingBuffer<4> = RingBuffer::new();
        assert_eq!(ring.capacity(), 3);
        assert!(ring.push(10));
        assert!(ring.push(11));
        assert!(ring.push(12));
        assert!(!ring.push(13)); // full, dropped
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(10));
    }

    #[test]
    fn test_wraparound() {
        let ring: RingBuffer<4> = RingBuffer::new();
        for round in 0..10u8 {
            assert!(ring.push(round));
            assert!(ring.push(round.wrapping_add(100)));
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round.wrapping_add(100)));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reset_discards() {
        let ring: RingBuffer<8> = RingBuffer::new();
        ring.push(1);
        ring.push(2);
        ring.pop();
        ring.reset();
        assert!(!ring.has_data());
        assert_eq!(ring.len(), 0);
        assert!(ring.push(7));
        assert_eq!(ring.pop(), Some(7));
    }

    #[test]
    fn test_inbox_activity() {
        let inbox: SerialInbox<16> = SerialInbox::new();
        assert_eq!(inbox.last_activity(), None);

        inbox.deliver(0xAA, 1234);
        assert_eq!(inbox.last_activity(), Some(1234));
        assert_eq!(inbox.ring().pop(), Some(0xAA));

        inbox.reset();
        assert_eq!(inbox.last_activity(), None);
    }

    #[test]
    fn test_inbox_stamps_dropped_bytes() {
        let inbox: SerialInbox<2> = SerialInbox::new();
        assert!(inbox.deliver(1, 10));
        assert!(!inbox.deliver(2, 20));
        // The line is alive even if the byte was dropped
        assert_eq!(inbox.last_activity(), Some(20));
    }

    proptest! {
        #[test]
        fn prop_overflow_keeps_oldest(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let ring: RingBuffer<16> = RingBuffer::new();
            for &b in &data {
                ring.push(b);
            }

            let kept = data.len().min(ring.capacity());
            for &expected in &data[..kept] {
                prop_assert_eq!(ring.pop(), Some(expected));
            }
            prop_assert_eq!(ring.pop(), None);
        }

        #[test]
        fn prop_interleaved_matches_queue(ops in proptest::collection::vec(any::<Option<u8>>(), 0..200)) {
            // Some(b) = push, None = pop; compare against a reference queue
            let ring: RingBuffer<8> = RingBuffer::new();
            let mut model = std::collections::VecDeque::new();

            for op in ops {
                match op {
                    Some(b) => {
                        let accepted = ring.push(b);
                        prop_assert_eq!(accepted, model.len() < ring.capacity());
                        if accepted {
                            model.push_back(b);
                        }
                    }
                    None => prop_assert_eq!(ring.pop(), model.pop_front()),
                }
            }
        }
    }
}
