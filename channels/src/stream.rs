//! Restartable take sequences.

use crate::chan::Channel;
use crate::error::ChannelError;
use crate::internal::waiter::Settlement;

use futures_core::Stream;

use core::task::{ready, Context, Poll};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// A sequence of takes on one channel.
///
/// As a [`Future`] it resolves with the first take. As a [`Stream`] it yields
/// that first result and then issues a fresh `take()` for every following
/// item. The stream ends when a take fails with [`ChannelError::Closed`];
/// other failures are yielded as items. Dropping a `Takes` withdraws its
/// pending take, so no value is consumed on its behalf afterwards.
pub struct Takes<T> {
  channel: Channel<T>,
  pending: Option<Settlement<T>>,
  // Set once the future form has produced its output.
  resolved: bool,
  done: bool,
}

impl<T> fmt::Debug for Takes<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Takes")
      .field("channel", &self.channel.id())
      .field("pending", &self.pending.is_some())
      .field("resolved", &self.resolved)
      .field("done", &self.done)
      .finish()
  }
}

impl<T: Clone + Send + 'static> Takes<T> {
  /// Registers the first take immediately.
  pub(crate) fn eager(channel: Channel<T>) -> Self {
    let pending = Some(channel.take());
    Takes {
      channel,
      pending,
      resolved: false,
      done: false,
    }
  }

  /// Registers nothing until first polled.
  pub(crate) fn lazy(channel: Channel<T>) -> Self {
    Takes {
      channel,
      pending: None,
      resolved: false,
      done: false,
    }
  }

  /// The channel being taken from.
  pub fn channel(&self) -> &Channel<T> {
    &self.channel
  }

  fn poll_take(&mut self, cx: &mut Context<'_>) -> Poll<Result<T, ChannelError>> {
    let channel = &self.channel;
    let pending = self.pending.get_or_insert_with(|| channel.take());
    let outcome = ready!(Pin::new(pending).poll(cx));
    self.pending = None;
    Poll::Ready(outcome)
  }
}

impl<T> Drop for Takes<T> {
  fn drop(&mut self) {
    if let Some(pending) = &self.pending {
      if !pending.is_settled() {
        self.channel.withdraw_take(pending);
      }
    }
  }
}

impl<T: Clone + Send + 'static> Future for Takes<T> {
  type Output = Result<T, ChannelError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    assert!(!this.resolved, "Takes polled after completion");
    let outcome = ready!(this.poll_take(cx));
    this.resolved = true;
    Poll::Ready(outcome)
  }
}

impl<T: Clone + Send + 'static> Stream for Takes<T> {
  type Item = Result<T, ChannelError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if this.done {
      return Poll::Ready(None);
    }
    match ready!(this.poll_take(cx)) {
      Err(ChannelError::Closed) => {
        this.done = true;
        Poll::Ready(None)
      }
      outcome => Poll::Ready(Some(outcome)),
    }
  }
}
