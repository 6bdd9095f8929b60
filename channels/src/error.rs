// src/error.rs

use core::fmt;
use std::error::Error;
use std::sync::Arc;

/// Error returned when a ring buffer (or any buffer policy built on one) is
/// requested with a capacity of zero.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InvalidCapacity;
impl std::error::Error for InvalidCapacity {}
impl fmt::Display for InvalidCapacity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "can't create a ring buffer of size 0")
  }
}

/// A producer-side failure travelling through a channel in place of a value.
///
/// Every waiter a failure payload reaches (taker, putter or racer) is failed
/// with [`ChannelError::Failed`] instead of being fulfilled. Clones share the
/// same underlying error, so fan-out and pipe forwarding deliver the original
/// error to every destination.
#[derive(Clone)]
pub struct PayloadFailure {
  source: Arc<dyn Error + Send + Sync + 'static>,
}

impl PayloadFailure {
  /// Wraps any error as a failure payload.
  pub fn new<E>(error: E) -> Self
  where
    E: Error + Send + Sync + 'static,
  {
    PayloadFailure {
      source: Arc::new(error),
    }
  }

  /// Builds a failure payload from a plain message.
  pub fn msg(message: impl Into<String>) -> Self {
    PayloadFailure {
      source: Arc::new(Message(message.into())),
    }
  }

  /// The wrapped error.
  pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
    &*self.source
  }
}

impl fmt::Debug for PayloadFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("PayloadFailure").field(&self.source.to_string()).finish()
  }
}

impl fmt::Display for PayloadFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "payload failure: {}", self.source)
  }
}

impl std::error::Error for PayloadFailure {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    Some(&*self.source)
  }
}

// Two failures are equal when they carry the same shared error.
impl PartialEq for PayloadFailure {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.source, &other.source)
  }
}
impl Eq for PayloadFailure {}

#[derive(Debug)]
struct Message(String);
impl std::error::Error for Message {}
impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Error delivered to a pending `put`, `take` or `race` settlement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ChannelError {
  /// The matched payload was a producer-side failure.
  Failed(PayloadFailure),
  /// The select participant lost and was removed by `cancel_race`.
  Cancelled,
  /// The channel was closed while the waiter was pending, or before it was registered.
  Closed,
}
impl std::error::Error for ChannelError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      ChannelError::Failed(failure) => Some(failure),
      _ => None,
    }
  }
}
impl fmt::Display for ChannelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChannelError::Failed(failure) => write!(f, "{}", failure),
      ChannelError::Cancelled => write!(f, "select participant cancelled"),
      ChannelError::Closed => write!(f, "channel closed"),
    }
  }
}

impl From<PayloadFailure> for ChannelError {
  fn from(failure: PayloadFailure) -> Self {
    ChannelError::Failed(failure)
  }
}

/// Error returned by `stake` when no value could be taken synchronously.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TryTakeError {
  /// No buffered payload with a matching pending putter.
  Empty,
  /// A pair was matched but the payload was a failure. The putter was failed too.
  Failed(PayloadFailure),
}
impl std::error::Error for TryTakeError {}
impl fmt::Display for TryTakeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryTakeError::Empty => write!(f, "no buffered value with a pending putter"),
      TryTakeError::Failed(failure) => write!(f, "{}", failure),
    }
  }
}
