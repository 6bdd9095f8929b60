use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a channel.
///
/// Every handle cloned from the same channel reports the same id; ids are
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
  pub(crate) fn next() -> Self {
    ChannelId(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
  }

  /// The raw numeric value, useful for logging.
  #[inline]
  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl fmt::Display for ChannelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "chan-{}", self.0)
  }
}
