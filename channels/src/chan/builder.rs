use super::{Channel, Payload, Transform, DEFAULT_BUFFER_CAPACITY};
use crate::buffer::{dropping, fixed, sliding, Buffer};
use crate::error::InvalidCapacity;

use std::fmt;
use std::sync::Arc;

enum BufferChoice<T> {
  Fixed(usize),
  Dropping(usize),
  Sliding(usize),
  Custom(Box<dyn Buffer<Payload<T>>>),
}

/// A builder for [`Channel`]s.
///
/// ```
/// use fibre_csp::Channel;
///
/// let ch = Channel::<u32>::builder()
///   .sliding(4)
///   .transform(|x| x * 10)
///   .build()
///   .unwrap();
/// assert!(!ch.is_closed());
/// ```
pub struct ChannelBuilder<T> {
  buffer: BufferChoice<T>,
  transform: Option<Transform<T>>,
}

impl<T> fmt::Debug for ChannelBuilder<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let buffer = match &self.buffer {
      BufferChoice::Fixed(n) => format!("fixed({})", n),
      BufferChoice::Dropping(n) => format!("dropping({})", n),
      BufferChoice::Sliding(n) => format!("sliding({})", n),
      BufferChoice::Custom(_) => "custom".to_string(),
    };
    f.debug_struct("ChannelBuilder")
      .field("buffer", &buffer)
      .field("has_transform", &self.transform.is_some())
      .finish()
  }
}

impl<T: Clone + Send + 'static> Default for ChannelBuilder<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + Send + 'static> ChannelBuilder<T> {
  pub fn new() -> Self {
    ChannelBuilder {
      buffer: BufferChoice::Fixed(DEFAULT_BUFFER_CAPACITY.get()),
      transform: None,
    }
  }

  /// Uses a fixed buffer with nominal size `capacity`.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.buffer = BufferChoice::Fixed(capacity);
    self
  }

  /// Uses a dropping buffer holding at most `n` payloads.
  pub fn dropping(mut self, n: usize) -> Self {
    self.buffer = BufferChoice::Dropping(n);
    self
  }

  /// Uses a sliding buffer holding at most `n` payloads.
  pub fn sliding(mut self, n: usize) -> Self {
    self.buffer = BufferChoice::Sliding(n);
    self
  }

  /// Uses a caller-provided buffer.
  pub fn buffer<B>(mut self, buffer: B) -> Self
  where
    B: Buffer<Payload<T>> + 'static,
  {
    self.buffer = BufferChoice::Custom(Box::new(buffer));
    self
  }

  /// Output transform applied to every value at delivery.
  pub fn transform(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
    self.transform = Some(Arc::new(f));
    self
  }

  /// Builds the channel. Fails when a buffer size of zero was requested.
  pub fn build(self) -> Result<Channel<T>, InvalidCapacity> {
    let buffer: Box<dyn Buffer<Payload<T>>> = match self.buffer {
      BufferChoice::Fixed(n) => Box::new(fixed(n)?),
      BufferChoice::Dropping(n) => Box::new(dropping(n)?),
      BufferChoice::Sliding(n) => Box::new(sliding(n)?),
      BufferChoice::Custom(buffer) => buffer,
    };
    Ok(Channel::from_parts(buffer, self.transform))
  }
}
