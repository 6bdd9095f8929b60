// src/buffer/policy.rs

//! Overflow policies layered over [`RingBuffer`].

use super::ring::RingBuffer;
use super::Buffer;
use crate::error::InvalidCapacity;

use std::num::NonZeroUsize;

/// A buffer that grows past its nominal size instead of shedding load.
///
/// `is_full` reports when occupancy equals the nominal size, but `add` always
/// succeeds. Producers are never pushed back through the buffer.
#[derive(Debug)]
pub struct FixedBuffer<T> {
  buffer: RingBuffer<T>,
  n: usize,
}

impl<T> FixedBuffer<T> {
  pub fn new(n: NonZeroUsize) -> Self {
    FixedBuffer {
      buffer: RingBuffer::with_capacity(n),
      n: n.get(),
    }
  }
}

/// Creates a [`FixedBuffer`] with nominal size `n`.
pub fn fixed<T>(n: usize) -> Result<FixedBuffer<T>, InvalidCapacity> {
  NonZeroUsize::new(n).map(FixedBuffer::new).ok_or(InvalidCapacity)
}

impl<T: Send> Buffer<T> for FixedBuffer<T> {
  fn add(&mut self, item: T) {
    self.buffer.unbounded_add(item);
  }

  fn remove(&mut self) -> Option<T> {
    self.buffer.remove()
  }

  fn count(&self) -> usize {
    self.buffer.len()
  }

  fn is_full(&self) -> bool {
    self.buffer.len() == self.n
  }
}

/// A buffer that silently discards new items once it holds `n`.
#[derive(Debug)]
pub struct DroppingBuffer<T> {
  buffer: RingBuffer<T>,
  n: usize,
}

impl<T> DroppingBuffer<T> {
  pub fn new(n: NonZeroUsize) -> Self {
    DroppingBuffer {
      buffer: RingBuffer::with_capacity(n),
      n: n.get(),
    }
  }
}

/// Creates a [`DroppingBuffer`] holding at most `n` items.
pub fn dropping<T>(n: usize) -> Result<DroppingBuffer<T>, InvalidCapacity> {
  NonZeroUsize::new(n).map(DroppingBuffer::new).ok_or(InvalidCapacity)
}

impl<T: Send> Buffer<T> for DroppingBuffer<T> {
  fn add(&mut self, item: T) {
    if self.buffer.len() != self.n {
      // Capacity equals n, so there is a free slot here.
      let _ = self.buffer.add(item);
    }
  }

  fn remove(&mut self) -> Option<T> {
    self.buffer.remove()
  }

  fn count(&self) -> usize {
    self.buffer.len()
  }

  // Never full: the newest item is the one that gets dropped.
  fn is_full(&self) -> bool {
    false
  }
}

/// A buffer that evicts its oldest item to make room once it holds `n`.
#[derive(Debug)]
pub struct SlidingBuffer<T> {
  buffer: RingBuffer<T>,
  n: usize,
}

impl<T> SlidingBuffer<T> {
  pub fn new(n: NonZeroUsize) -> Self {
    SlidingBuffer {
      buffer: RingBuffer::with_capacity(n),
      n: n.get(),
    }
  }
}

/// Creates a [`SlidingBuffer`] holding at most `n` items.
pub fn sliding<T>(n: usize) -> Result<SlidingBuffer<T>, InvalidCapacity> {
  NonZeroUsize::new(n).map(SlidingBuffer::new).ok_or(InvalidCapacity)
}

impl<T: Send> Buffer<T> for SlidingBuffer<T> {
  fn add(&mut self, item: T) {
    if self.buffer.len() == self.n {
      self.buffer.remove();
    }
    let _ = self.buffer.add(item);
  }

  fn remove(&mut self) -> Option<T> {
    self.buffer.remove()
  }

  fn count(&self) -> usize {
    self.buffer.len()
  }

  fn is_full(&self) -> bool {
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn drain<T: Send>(buf: &mut dyn Buffer<T>) -> Vec<T> {
    std::iter::from_fn(|| buf.remove()).collect()
  }

  #[test]
  fn constructors_reject_zero() {
    assert!(fixed::<u8>(0).is_err());
    assert!(dropping::<u8>(0).is_err());
    assert!(sliding::<u8>(0).is_err());
  }

  #[test]
  fn fixed_grows_past_nominal_size() {
    let mut buf = fixed::<i32>(2).unwrap();
    buf.add(1);
    assert!(!buf.is_full());
    buf.add(2);
    assert!(buf.is_full());
    buf.add(3);
    buf.add(4);
    assert!(!buf.is_full());
    assert_eq!(buf.count(), 4);
    assert_eq!(drain(&mut buf), vec![1, 2, 3, 4]);
  }

  #[test]
  fn dropping_discards_newest() {
    let mut buf = dropping::<i32>(2).unwrap();
    for i in 1..=3 {
      buf.add(i);
      assert!(!buf.is_full());
    }
    assert_eq!(buf.count(), 2);
    assert_eq!(drain(&mut buf), vec![1, 2]);
  }

  #[test]
  fn sliding_discards_oldest() {
    let mut buf = sliding::<i32>(2).unwrap();
    for i in 1..=5 {
      buf.add(i);
      assert!(!buf.is_full());
    }
    assert_eq!(buf.count(), 2);
    assert_eq!(drain(&mut buf), vec![4, 5]);
  }

  #[test]
  fn sliding_of_one_keeps_latest() {
    let mut buf = sliding::<&str>(1).unwrap();
    buf.add("a");
    buf.add("b");
    assert_eq!(buf.remove(), Some("b"));
    assert_eq!(buf.remove(), None);
  }
}
