//! Wait-free single-producer single-consumer channel.
//!
//! This is the thread boundary the rest of the crate is built around: a
//! bounded, fixed-capacity queue that moves values between exactly two
//! threads without locking, blocking, or allocating. The intended consumer
//! is a real-time callback (the audio thread), which must complete in
//! bounded time no matter what the producer is doing.
//!
//! Both [`Producer::try_push`] and [`Consumer::try_pop`] finish in a small,
//! bounded number of steps: one relaxed load of the caller's own index, one
//! acquire load of the other side's index, at most one slot access, and one
//! release store. There is no retry loop, no compare-and-swap, and no
//! internal sleeping - a full or empty channel is reported immediately and
//! the caller chooses its own retry policy.
//!
//! # Example
//!
//! ```
//! use audio_channel::channel;
//!
//! let (mut tx, mut rx) = channel::<u64>(8).unwrap();
//!
//! tx.try_push(1).unwrap();
//! tx.try_push(2).unwrap();
//!
//! assert_eq!(rx.try_pop(), Some(1));
//! assert_eq!(rx.try_pop(), Some(2));
//! assert_eq!(rx.try_pop(), None);
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::error::ChannelError;

/// Creates a bounded SPSC channel holding up to `capacity` elements.
///
/// The backing storage is rounded up to the next power of two for cheap
/// index masking, but the usable capacity is exactly `capacity`: the
/// channel accepts `capacity` elements before reporting full, and
/// [`Producer::capacity`] returns the requested value, not the rounded one.
///
/// The returned handles are the only way to touch the channel. Each is
/// `Send` but its operations take `&mut self`, so the single-producer
/// single-consumer contract is enforced by the type system rather than by
/// convention.
///
/// # Errors
///
/// Returns [`ChannelError::InvalidCapacity`] if `capacity` is zero or too
/// large for its power-of-two rounding to fit in `usize`.
pub fn channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), ChannelError> {
    let shared = Arc::new(Shared::new(capacity)?);
    Ok((
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    ))
}

/// Channel state shared by the two handles.
struct Shared<T> {
    /// Producer's write position. Free-running; masked on slot access.
    write: CachePadded<AtomicUsize>,
    /// Consumer's read position. Free-running; masked on slot access.
    read: CachePadded<AtomicUsize>,
    /// Slot storage. Length is `capacity` rounded up to a power of two.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Usable capacity, exactly as requested at construction.
    capacity: usize,
    /// `slots.len() - 1`, for masking free-running indices.
    mask: usize,
}

// SAFETY: the slots are plain storage; all cross-thread access is ordered
// through the two atomic indices. The producer only writes a slot before
// publishing it with a Release store of `write`, and the consumer only
// reads it after an Acquire load observes that store (and vice versa for
// slot reuse through `read`).
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    fn new(capacity: usize) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity {
                requested: capacity,
            });
        }
        let len = capacity
            .checked_next_power_of_two()
            .ok_or(ChannelError::InvalidCapacity {
                requested: capacity,
            })?;

        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || UnsafeCell::new(MaybeUninit::uninit()));

        Ok(Self {
            write: CachePadded::new(AtomicUsize::new(0)),
            read: CachePadded::new(AtomicUsize::new(0)),
            slots: slots.into_boxed_slice(),
            capacity,
            mask: len - 1,
        })
    }

    /// Snapshot of the number of queued elements.
    fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Both handles are gone, so these loads cannot race.
        let write = self.write.load(Ordering::Relaxed);
        let mut read = self.read.load(Ordering::Relaxed);

        // Elements in [read, write) were pushed but never popped.
        while read != write {
            unsafe { (*self.slots[read & self.mask].get()).assume_init_drop() };
            read = read.wrapping_add(1);
        }
    }
}

/// The producing half of an SPSC channel.
///
/// Exactly one thread may hold this at a time; move it to the producer
/// thread and keep it there.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Attempts to push a value onto the channel.
    ///
    /// Returns the value back as `Err` if the channel is full, leaving the
    /// channel untouched. Never blocks and never allocates.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        // We are the only writer of `write`, so a relaxed load is enough.
        let write = self.shared.write.load(Ordering::Relaxed);
        // Acquire pairs with the consumer's Release in `try_pop`: once we
        // observe its advanced `read`, the slot it vacated is ours to reuse.
        let read = self.shared.read.load(Ordering::Acquire);

        if write.wrapping_sub(read) == self.shared.capacity {
            return Err(value);
        }

        // SAFETY: the slot at `write` is outside [read, write), so the
        // consumer cannot touch it until the Release store below makes the
        // new index - and this write - visible.
        unsafe { (*self.shared.slots[write & self.shared.mask].get()).write(value) };

        self.shared
            .write
            .store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Returns the capacity requested at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the number of queued elements. A snapshot; may be stale by
    /// the time the caller looks at it.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` if the channel currently holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the channel currently holds `capacity` elements.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.shared.capacity
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// The consuming half of an SPSC channel.
///
/// Exactly one thread may hold this at a time; move it to the consumer
/// thread (typically the audio callback) and keep it there.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// Attempts to pop the next value from the channel.
    ///
    /// Returns `None` if the channel is empty, leaving it untouched.
    /// Successful pops deliver values in exactly the order they were
    /// pushed. Never blocks and never allocates.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        // We are the only writer of `read`, so a relaxed load is enough.
        let read = self.shared.read.load(Ordering::Relaxed);
        // Acquire pairs with the producer's Release in `try_push`: once we
        // observe its advanced `write`, the slot it filled is fully written.
        let write = self.shared.write.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        // SAFETY: the slot at `read` is inside [read, write), so it was
        // initialized by a push whose Release store we have observed. The
        // producer will not reuse it until our Release store below.
        let value = unsafe { (*self.shared.slots[read & self.shared.mask].get()).assume_init_read() };

        self.shared
            .read
            .store(read.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Returns the capacity requested at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the number of queued elements. A snapshot; may be stale by
    /// the time the caller looks at it.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` if the channel currently holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the channel currently holds `capacity` elements.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.shared.capacity
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            channel::<u32>(0),
            Err(ChannelError::InvalidCapacity { requested: 0 })
        ));
    }

    #[test]
    fn capacity_reports_requested_value() {
        // 3 rounds to 4 slots internally; the caller still sees 3.
        let (tx, rx) = channel::<u32>(3).unwrap();
        assert_eq!(tx.capacity(), 3);
        assert_eq!(rx.capacity(), 3);
    }

    #[test]
    fn fill_receive_refill_at_capacity_three() {
        let (mut tx, mut rx) = channel::<u32>(3).unwrap();

        assert!(tx.try_push(1).is_ok());
        assert!(tx.try_push(2).is_ok());
        assert!(tx.try_push(3).is_ok());
        assert_eq!(tx.try_push(4), Err(4));

        assert_eq!(rx.try_pop(), Some(1));
        assert!(tx.try_push(4).is_ok());

        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), Some(3));
        assert_eq!(rx.try_pop(), Some(4));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn single_slot_channel() {
        let (mut tx, mut rx) = channel::<char>(1).unwrap();

        assert!(tx.try_push('A').is_ok());
        assert_eq!(tx.try_push('B'), Err('B'));

        assert_eq!(rx.try_pop(), Some('A'));
        assert_eq!(rx.try_pop(), None);

        assert!(tx.try_push('C').is_ok());
        assert_eq!(rx.try_pop(), Some('C'));
    }

    #[test]
    fn alternating_pairs_across_wraparound() {
        // Capacity 4 (storage 4): 20 push/pop pairs wrap the indices
        // several times; order must survive every wrap.
        let (mut tx, mut rx) = channel::<u32>(4).unwrap();

        for i in 0..20 {
            assert!(tx.try_push(i).is_ok());
            assert_eq!(rx.try_pop(), Some(i));
        }
    }

    #[test]
    fn fill_then_drain_repeatedly() {
        let (mut tx, mut rx) = channel::<u64>(4).unwrap();

        for lap in 0..100 {
            for i in 0..4 {
                assert!(tx.try_push(lap * 4 + i).is_ok());
            }
            assert!(tx.is_full());
            assert!(rx.is_full());
            for i in 0..4 {
                assert_eq!(rx.try_pop(), Some(lap * 4 + i));
            }
            assert!(rx.is_empty());
            assert!(!rx.is_full());
        }
    }

    #[test]
    fn len_tracks_occupancy() {
        let (mut tx, mut rx) = channel::<u8>(8).unwrap();

        assert_eq!(tx.len(), 0);
        for i in 0..5 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(tx.len(), 5);
        assert_eq!(rx.len(), 5);

        rx.try_pop().unwrap();
        rx.try_pop().unwrap();
        assert_eq!(rx.len(), 3);
    }

    #[test]
    fn heap_values_move_through_intact() {
        let (mut tx, mut rx) = channel::<String>(2).unwrap();

        tx.try_push("hello".to_string()).unwrap();
        tx.try_push("world".to_string()).unwrap();

        assert_eq!(rx.try_pop().as_deref(), Some("hello"));
        assert_eq!(rx.try_pop().as_deref(), Some("world"));
    }

    #[test]
    fn failed_push_returns_value_unchanged() {
        let (mut tx, _rx) = channel::<String>(1).unwrap();

        tx.try_push("kept".to_string()).unwrap();
        let rejected = tx.try_push("bounced".to_string()).unwrap_err();
        assert_eq!(rejected, "bounced");
        assert_eq!(tx.len(), 1);
    }

    #[test]
    fn undelivered_elements_are_dropped_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        #[derive(Debug)]
        struct DropCounter(Arc<AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let (mut tx, mut rx) = channel::<DropCounter>(4).unwrap();

        tx.try_push(DropCounter(Arc::clone(&drops))).unwrap();
        tx.try_push(DropCounter(Arc::clone(&drops))).unwrap();
        tx.try_push(DropCounter(Arc::clone(&drops))).unwrap();

        // One delivered and dropped by us, two left behind.
        drop(rx.try_pop());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(tx);
        drop(rx);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }
}
