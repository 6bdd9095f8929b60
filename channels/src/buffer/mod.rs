//! Message buffers for channels.
//!
//! A channel stores payloads that have been put but not yet delivered in a
//! [`Buffer`]. The policy decides what happens once the buffer reaches its
//! nominal size:
//!
//! | Policy | On overflow | `is_full` |
//! |--------|-------------|-----------|
//! | [`fixed`] | grows, nothing is lost | informational |
//! | [`dropping`] | the new item is discarded | always `false` |
//! | [`sliding`] | the oldest item is evicted | always `false` |
//!
//! All policies hand items back in FIFO order.
//!
//! ```
//! use fibre_csp::buffer::{dropping, Buffer};
//!
//! let mut buf = dropping::<i32>(2).unwrap();
//! buf.add(1);
//! buf.add(2);
//! buf.add(3);
//! assert_eq!(buf.remove(), Some(1));
//! assert_eq!(buf.remove(), Some(2));
//! assert_eq!(buf.remove(), None);
//! ```

mod policy;
mod ring;

pub use policy::{dropping, fixed, sliding, DroppingBuffer, FixedBuffer, SlidingBuffer};
pub use ring::{ring, RingBuffer};

/// Storage contract shared by every buffer policy.
pub trait Buffer<T>: Send {
  /// Offers an item to the buffer. Whether it is kept depends on the policy.
  fn add(&mut self, item: T);

  /// Removes the oldest item.
  fn remove(&mut self) -> Option<T>;

  /// Number of items currently held.
  fn count(&self) -> usize;

  fn is_full(&self) -> bool;

  /// Hook for releasing resources when the owning channel no longer needs the
  /// buffer. The built-in policies hold nothing that needs it.
  fn close_buffer(&mut self) {}
}

/// A bare ring used as a channel buffer grows on demand, like [`FixedBuffer`].
impl<T: Send> Buffer<T> for RingBuffer<T> {
  fn add(&mut self, item: T) {
    self.unbounded_add(item);
  }

  fn remove(&mut self) -> Option<T> {
    RingBuffer::remove(self)
  }

  fn count(&self) -> usize {
    self.len()
  }

  fn is_full(&self) -> bool {
    self.len() == self.capacity()
  }
}

impl<T, B> Buffer<T> for Box<B>
where
  B: Buffer<T> + ?Sized,
{
  fn add(&mut self, item: T) {
    (**self).add(item)
  }

  fn remove(&mut self) -> Option<T> {
    (**self).remove()
  }

  fn count(&self) -> usize {
    (**self).count()
  }

  fn is_full(&self) -> bool {
    (**self).is_full()
  }

  fn close_buffer(&mut self) {
    (**self).close_buffer()
  }
}
