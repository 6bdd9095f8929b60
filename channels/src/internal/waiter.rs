// src/internal/waiter.rs

//! Settle-once completion cells backing every pending `put`, `take` and `race`.
//!
//! A [`Waiter`] is the half stored in a channel queue; settling it (fulfil or
//! fail) stores the outcome and wakes the task polling the matching
//! [`Settlement`]. Only the first settle counts. Settling after the
//! `Settlement` was dropped simply discards the outcome.
//!
//! Every settle draws a number from a process-wide sequence, so callers that
//! hold several settlements (select) can tell which one settled first.

use crate::error::ChannelError;

use futures_util::task::AtomicWaker;
use parking_lot::Mutex;

use core::task::{Context, Poll, Waker};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SETTLE_ORDER: AtomicU64 = AtomicU64::new(0);

fn next_settle_order() -> u64 {
  NEXT_SETTLE_ORDER.fetch_add(1, Ordering::Relaxed)
}

enum SlotState<R> {
  Pending,
  Settled { outcome: Result<R, ChannelError>, order: u64 },
  Taken,
}

struct Slot<R> {
  state: Mutex<SlotState<R>>,
  waker: AtomicWaker,
}

impl<R> Slot<R> {
  fn new(state: SlotState<R>) -> Self {
    Slot {
      state: Mutex::new(state),
      waker: AtomicWaker::new(),
    }
  }

  fn try_take(&self) -> Option<Result<R, ChannelError>> {
    let mut state = self.state.lock();
    match std::mem::replace(&mut *state, SlotState::Taken) {
      SlotState::Settled { outcome, .. } => Some(outcome),
      SlotState::Pending => {
        *state = SlotState::Pending;
        None
      }
      SlotState::Taken => panic!("Settlement polled after completion"),
    }
  }
}

/// The settling half of a pending operation, held in a channel's queue.
pub(crate) struct Waiter<R> {
  slot: Arc<Slot<R>>,
}

// Cloned only for `race`, where an immediate consumption and the queued racer
// record share one settlement.
impl<R> Clone for Waiter<R> {
  fn clone(&self) -> Self {
    Waiter {
      slot: Arc::clone(&self.slot),
    }
  }
}

impl<R> fmt::Debug for Waiter<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Waiter")
      .field("settled", &self.is_settled())
      .finish_non_exhaustive()
  }
}

/// Creates a linked waiter / settlement pair.
pub(crate) fn waiter<R>() -> (Waiter<R>, Settlement<R>) {
  let slot = Arc::new(Slot::new(SlotState::Pending));
  (
    Waiter {
      slot: Arc::clone(&slot),
    },
    Settlement { slot },
  )
}

impl<R> Waiter<R> {
  /// Stores `outcome` and wakes the settlement's task. Returns `false` if the
  /// waiter had already been settled, in which case `outcome` is dropped.
  pub(crate) fn settle(&self, outcome: Result<R, ChannelError>) -> bool {
    {
      let mut state = self.slot.state.lock();
      if !matches!(*state, SlotState::Pending) {
        return false;
      }
      *state = SlotState::Settled {
        outcome,
        order: next_settle_order(),
      };
    }
    self.slot.waker.wake();
    true
  }

  #[inline]
  pub(crate) fn fulfill(&self, value: R) -> bool {
    self.settle(Ok(value))
  }

  #[inline]
  pub(crate) fn fail(&self, error: ChannelError) -> bool {
    self.settle(Err(error))
  }

  pub(crate) fn is_settled(&self) -> bool {
    !matches!(*self.slot.state.lock(), SlotState::Pending)
  }

  /// True when this waiter settles `settlement`.
  pub(crate) fn belongs_to(&self, settlement: &Settlement<R>) -> bool {
    Arc::ptr_eq(&self.slot, &settlement.slot)
  }
}

/// Future resolving once a channel operation has been matched (or failed).
///
/// The operation itself was registered with the channel when the settlement
/// was created; dropping the settlement does not withdraw it.
pub struct Settlement<R> {
  slot: Arc<Slot<R>>,
}

impl<R> Settlement<R> {
  /// A settlement that is already resolved with `outcome`.
  pub(crate) fn ready(outcome: Result<R, ChannelError>) -> Self {
    Settlement {
      slot: Arc::new(Slot::new(SlotState::Settled {
        outcome,
        order: next_settle_order(),
      })),
    }
  }

  /// True once the outcome is available (or has been consumed).
  pub fn is_settled(&self) -> bool {
    !matches!(*self.slot.state.lock(), SlotState::Pending)
  }

  /// Position in the global settle sequence, if settled and not yet taken.
  pub(crate) fn settle_order(&self) -> Option<u64> {
    match *self.slot.state.lock() {
      SlotState::Settled { order, .. } => Some(order),
      _ => None,
    }
  }

  pub(crate) fn register(&self, waker: &Waker) {
    self.slot.waker.register(waker);
  }

  /// Takes the outcome if settled, without registering a waker.
  pub(crate) fn take_outcome(&mut self) -> Option<Result<R, ChannelError>> {
    self.slot.try_take()
  }
}

impl<R> fmt::Debug for Settlement<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Settlement")
      .field("settled", &self.is_settled())
      .finish_non_exhaustive()
  }
}

impl<R> Future for Settlement<R> {
  type Output = Result<R, ChannelError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    if let Some(outcome) = self.slot.try_take() {
      return Poll::Ready(outcome);
    }

    self.slot.waker.register(cx.waker());

    // Re-check after registering so a settle racing with registration is not missed.
    match self.slot.try_take() {
      Some(outcome) => Poll::Ready(outcome),
      None => Poll::Pending,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn first_settle_wins() {
    let (w, s) = waiter::<u32>();
    assert!(w.fulfill(1));
    assert!(!w.fulfill(2));
    assert!(!w.fail(ChannelError::Cancelled));
    assert_eq!(s.await, Ok(1));
  }

  #[tokio::test]
  async fn settle_wakes_pending_task() {
    let (w, s) = waiter::<&'static str>();
    let handle = tokio::spawn(s);
    tokio::task::yield_now().await;
    assert!(w.fail(ChannelError::Closed));
    assert_eq!(handle.await.unwrap(), Err(ChannelError::Closed));
  }

  #[test]
  fn settle_after_drop_is_harmless() {
    let (w, s) = waiter::<String>();
    drop(s);
    assert!(w.fulfill("orphan".to_string()));
    assert!(w.is_settled());
  }

  #[test]
  fn settle_order_follows_settle_time() {
    let (w1, s1) = waiter::<u8>();
    let (w2, s2) = waiter::<u8>();
    assert_eq!(s1.settle_order(), None);
    w2.fulfill(2);
    w1.fulfill(1);
    let (o1, o2) = (s1.settle_order().unwrap(), s2.settle_order().unwrap());
    assert!(o2 < o1);
    assert!(w1.belongs_to(&s1));
    assert!(!w1.belongs_to(&s2));
  }

  #[tokio::test]
  async fn ready_settlement_resolves_immediately() {
    let s = Settlement::<u8>::ready(Err(ChannelError::Closed));
    assert!(s.is_settled());
    assert_eq!(s.await, Err(ChannelError::Closed));
  }
}
