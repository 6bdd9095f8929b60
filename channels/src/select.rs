//! Select over several channels.
//!
//! [`alts`] races every channel's next delivery. The race that settled first
//! wins, even when several have settled by the time the select is polled;
//! every channel whose id differs from the winner's then has one pending
//! racer cancelled so that it cannot swallow a later, unrelated value.
//! A loser that had already settled keeps its value out of its channel, so
//! that value is lost, as it is for any abandoned race.
//!
//! ```
//! use fibre_csp::{alts, chan};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let a = chan::<&str>();
//! let b = chan::<&str>();
//! let select = alts(&[a.clone(), b.clone()]);
//! let _ = a.put("foo");
//! let (winner, value) = select.await.unwrap();
//! assert_eq!(winner.id(), a.id());
//! assert_eq!(value, "foo");
//! # });
//! ```

use crate::chan::Channel;
use crate::error::ChannelError;
use crate::internal::waiter::Settlement;
use crate::telemetry;

use futures_core::Stream;

use core::task::{ready, Context, Poll};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

const LOC_ALTS: &str = "Alts::poll_round";
const EVT_WINNER: &str = "Alts:Winner";
const CTR_ROUNDS: &str = "AltsRounds";

/// The result of a select: the winning channel and the value it delivered.
pub type Selected<T> = (Channel<T>, T);

/// Races `channels` and resolves with the first delivery.
///
/// The races are registered before this returns. The returned [`Alts`] is a
/// future for that first round and a stream whose later items each run a new
/// round (race plus cancellation) over the same channels. An empty channel
/// set never resolves. Dropping an [`Alts`] withdraws the racers of its
/// unfinished round.
pub fn alts<T: Clone + Send + 'static>(channels: &[Channel<T>]) -> Alts<T> {
  let mut alts = Alts {
    channels: channels.to_vec(),
    races: Vec::new(),
    resolved: false,
    done: false,
  };
  alts.start_round();
  alts
}

/// A select in progress. See [`alts`].
pub struct Alts<T> {
  channels: Vec<Channel<T>>,
  races: Vec<Settlement<Selected<T>>>,
  // Set once the future form has produced its output.
  resolved: bool,
  done: bool,
}

impl<T> fmt::Debug for Alts<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Alts")
      .field("channels", &self.channels.iter().map(Channel::id).collect::<Vec<_>>())
      .field("in_flight", &!self.races.is_empty())
      .field("resolved", &self.resolved)
      .field("done", &self.done)
      .finish()
  }
}

impl<T> Alts<T> {
  // Index of the race that settled earliest, if any has.
  fn earliest(&self) -> Option<usize> {
    self
      .races
      .iter()
      .enumerate()
      .filter_map(|(index, race)| race.settle_order().map(|order| (order, index)))
      .min()
      .map(|(_, index)| index)
  }
}

impl<T: Clone + Send + 'static> Alts<T> {
  fn start_round(&mut self) {
    telemetry::increment_counter(LOC_ALTS, CTR_ROUNDS);
    self.races = self.channels.iter().map(Channel::race).collect();
  }

  fn poll_round(&mut self, cx: &mut Context<'_>) -> Poll<Result<Selected<T>, ChannelError>> {
    if self.races.is_empty() {
      if self.channels.is_empty() {
        return Poll::Pending;
      }
      self.start_round();
    }

    let index = match self.earliest() {
      Some(index) => index,
      None => {
        for race in &self.races {
          race.register(cx.waker());
        }
        // Re-check after registering so a settle racing with registration is not missed.
        match self.earliest() {
          Some(index) => index,
          None => return Poll::Pending,
        }
      }
    };
    let Some(outcome) = self.races[index].take_outcome() else {
      return Poll::Pending;
    };

    let winner_id = self.channels[index].id();
    telemetry::log_event(Some(winner_id.as_u64()), LOC_ALTS, EVT_WINNER, None);
    for channel in &self.channels {
      if channel.id() != winner_id {
        channel.cancel_race();
      }
    }
    self.races.clear();
    Poll::Ready(outcome)
  }
}

impl<T> Drop for Alts<T> {
  fn drop(&mut self) {
    for (channel, race) in self.channels.iter().zip(&self.races) {
      if !race.is_settled() {
        channel.withdraw_race(race);
      }
    }
  }
}

impl<T: Clone + Send + 'static> Future for Alts<T> {
  type Output = Result<Selected<T>, ChannelError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    assert!(!this.resolved, "Alts polled after completion");
    let outcome = ready!(this.poll_round(cx));
    this.resolved = true;
    Poll::Ready(outcome)
  }
}

impl<T: Clone + Send + 'static> Stream for Alts<T> {
  type Item = Result<Selected<T>, ChannelError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if this.done {
      return Poll::Ready(None);
    }
    match ready!(this.poll_round(cx)) {
      Err(ChannelError::Closed) => {
        this.done = true;
        Poll::Ready(None)
      }
      outcome => Poll::Ready(Some(outcome)),
    }
  }
}
