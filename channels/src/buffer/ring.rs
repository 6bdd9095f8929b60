// src/buffer/ring.rs

//! Array-backed circular FIFO with on-demand doubling.
//!
//! The ring is the storage under every buffer policy and under each channel's
//! waiter queues. It is not synchronized; the owning channel guards it with
//! its own mutex.

use crate::error::InvalidCapacity;

use std::fmt;
use std::num::NonZeroUsize;

/// Fixed-capacity circular FIFO that can grow by doubling.
///
/// `read` points at the oldest element, `write` at the next free slot. When
/// `read == write` the ring is either empty (`len() == 0`) or completely full
/// (`len() == capacity()`).
pub struct RingBuffer<T> {
  write: usize,
  read: usize,
  length: usize,
  slots: Box<[Option<T>]>,
}

impl<T> fmt::Debug for RingBuffer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RingBuffer")
      .field("write", &self.write)
      .field("read", &self.read)
      .field("length", &self.length)
      .field("capacity", &self.slots.len())
      .finish()
  }
}

/// Creates an empty ring with room for `n` elements.
///
/// Fails with [`InvalidCapacity`] when `n` is zero.
pub fn ring<T>(n: usize) -> Result<RingBuffer<T>, InvalidCapacity> {
  NonZeroUsize::new(n)
    .map(RingBuffer::with_capacity)
    .ok_or(InvalidCapacity)
}

impl<T> RingBuffer<T> {
  /// Creates an empty ring with room for `capacity` elements.
  pub fn with_capacity(capacity: NonZeroUsize) -> Self {
    RingBuffer {
      write: 0,
      read: 0,
      length: 0,
      slots: empty_slots(capacity.get()),
    }
  }

  /// Number of stored elements.
  #[inline]
  pub fn len(&self) -> usize {
    self.length
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.length == 0
  }

  /// Current size of the backing storage.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  /// Removes and returns the oldest element, or `None` when empty.
  pub fn remove(&mut self) -> Option<T> {
    if self.length == 0 {
      return None;
    }
    let item = self.slots[self.read].take();
    self.read = (self.read + 1) % self.slots.len();
    self.length -= 1;
    item
  }

  /// Stores `item` at the write position.
  ///
  /// The ring never overwrites: when every slot is occupied the item is handed
  /// back as `Err(item)`. Callers that want growth use [`unbounded_add`](Self::unbounded_add).
  pub fn add(&mut self, item: T) -> Result<(), T> {
    if self.length == self.slots.len() {
      return Err(item);
    }
    self.slots[self.write] = Some(item);
    self.write = (self.write + 1) % self.slots.len();
    self.length += 1;
    Ok(())
  }

  /// Stores `item`, doubling the storage first when this add would take the
  /// last free slot.
  pub fn unbounded_add(&mut self, item: T) {
    if self.length + 1 >= self.slots.len() {
      self.grow();
    }
    let added = self.add(item);
    debug_assert!(added.is_ok(), "ring must have a free slot after growth");
  }

  /// Drains every element in FIFO order and re-adds only those for which
  /// `keep` returns true. Relative order of the survivors is unchanged.
  pub fn cleanup<F>(&mut self, mut keep: F)
  where
    F: FnMut(&T) -> bool,
  {
    for _ in 0..self.length {
      if let Some(item) = self.remove() {
        if keep(&item) {
          // A slot was just freed by `remove`.
          let _ = self.add(item);
        }
      }
    }
  }

  /// Iterates over the stored elements, oldest first.
  pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
    let cap = self.slots.len();
    (0..self.length).filter_map(move |i| self.slots[(self.read + i) % cap].as_ref())
  }

  // Doubles the storage and re-linearizes the contents from index 0. Walking
  // from `read` modulo the old capacity covers the unwrapped (read < write),
  // wrapped (read > write) and full (read == write) layouts alike.
  fn grow(&mut self) {
    let old_cap = self.slots.len();
    let mut next = empty_slots(old_cap * 2);
    for (i, slot) in next.iter_mut().enumerate().take(self.length) {
      *slot = self.slots[(self.read + i) % old_cap].take();
    }
    self.slots = next;
    self.read = 0;
    self.write = self.length;
  }
}

fn empty_slots<T>(capacity: usize) -> Box<[Option<T>]> {
  let mut slots = Vec::with_capacity(capacity);
  slots.resize_with(capacity, || None);
  slots.into_boxed_slice()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn drain<T>(buf: &mut RingBuffer<T>) -> Vec<T> {
    std::iter::from_fn(|| buf.remove()).collect()
  }

  #[test]
  fn zero_capacity_is_rejected() {
    assert_eq!(ring::<u8>(0).unwrap_err(), InvalidCapacity);
    assert!(ring::<u8>(1).is_ok());
  }

  #[test]
  fn remove_on_empty_returns_none() {
    let mut buf = ring::<i32>(4).unwrap();
    assert_eq!(buf.remove(), None);
    assert_eq!(buf.len(), 0);
  }

  #[test]
  fn add_refuses_when_full() {
    let mut buf = ring(2).unwrap();
    assert_eq!(buf.add(1), Ok(()));
    assert_eq!(buf.add(2), Ok(()));
    assert_eq!(buf.add(3), Err(3));
    assert_eq!(drain(&mut buf), vec![1, 2]);
  }

  #[test]
  fn wrapped_contents_survive_growth() {
    let mut buf = ring(2).unwrap();
    buf.add(1).unwrap();
    buf.add(2).unwrap();
    assert_eq!(buf.remove(), Some(1));

    // read > write at this point; the next add triggers growth.
    buf.unbounded_add(3);
    buf.unbounded_add(4);
    buf.unbounded_add(5);

    assert!(buf.capacity() >= 4);
    assert_eq!(buf.len(), 4);
    assert_eq!(drain(&mut buf), vec![2, 3, 4, 5]);
  }

  #[test]
  fn growth_from_full_ring_keeps_order() {
    let mut buf = ring(3).unwrap();
    buf.add('a').unwrap();
    buf.add('b').unwrap();
    buf.add('c').unwrap();
    buf.remove();
    buf.add('d').unwrap();
    // Full, with read == write.
    assert_eq!(buf.len(), buf.capacity());

    buf.unbounded_add('e');
    assert_eq!(drain(&mut buf), vec!['b', 'c', 'd', 'e']);
  }

  #[test]
  fn unbounded_add_grows_many_times() {
    let mut buf = ring(1).unwrap();
    for i in 0..100 {
      buf.unbounded_add(i);
    }
    assert_eq!(buf.len(), 100);
    assert_eq!(drain(&mut buf), (0..100).collect::<Vec<_>>());
  }

  #[test]
  fn cleanup_keeps_matching_in_order() {
    let mut buf = ring(8).unwrap();
    for i in 1..=5 {
      buf.add(i).unwrap();
    }
    buf.cleanup(|x| x % 2 == 0);
    assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2, 4]);
    assert_eq!(drain(&mut buf), vec![2, 4]);
  }

  #[test]
  fn cleanup_on_wrapped_ring() {
    let mut buf = ring(5).unwrap();
    for i in 0..5 {
      buf.add(i).unwrap();
    }
    buf.remove();
    buf.remove();
    buf.add(5).unwrap();
    buf.add(6).unwrap();
    buf.cleanup(|x| *x != 4);
    assert_eq!(drain(&mut buf), vec![2, 3, 5, 6]);
  }
}
