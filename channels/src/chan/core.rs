// src/chan/core.rs

//! The mutex-guarded state of a channel and the pump that matches it.
//!
//! ### Design Principles:
//!
//! 1.  **Central Mutex**: a `parking_lot::Mutex` guards the message buffer, the
//!     three waiter queues and the piping configuration. It is held only for
//!     bookkeeping, never while user code (transforms) or another channel runs.
//! 2.  **Deferred settlement**: the pump never settles a waiter or touches a
//!     piped output while the lock is held. It records a [`Deferred`] action
//!     instead; the caller releases the lock and then runs the actions in the
//!     order they were recorded.
//! 3.  **Fixed precedence**: a buffered payload goes to a select racer first,
//!     then to piped outputs, then to a putter/taker pair.

use super::{Channel, Payload, Transform};
use crate::buffer::{Buffer, RingBuffer};
use crate::error::ChannelError;
use crate::id::ChannelId;
use crate::internal::waiter::Waiter;
use crate::telemetry;

use parking_lot::Mutex;

use std::fmt;
use std::num::NonZeroUsize;

pub(crate) const WAITER_QUEUE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(32) {
  Some(n) => n,
  None => unreachable!(),
};

const LOC_PUMP: &str = "ChannelState::pump";
const LOC_DETACH: &str = "ChannelState::detach_pipes";
const LOC_REJECT: &str = "ChannelState::reject_unreachable";

const EVT_RACER_MATCHED: &str = "Pump:RacerMatched";
const EVT_PIPE_FORWARD: &str = "Pump:PipeForward";
const EVT_PAIR_MATCHED: &str = "Pump:PairMatched";
const EVT_CASCADE_CLOSE: &str = "Detach:CascadeClose";
const EVT_REJECT_TAKER: &str = "Reject:Taker";
const EVT_REJECT_RACER: &str = "Reject:Racer";

const CTR_PUMP_PASSES: &str = "PumpPasses";
const CTR_PAIRS: &str = "PairsMatched";

pub(crate) type RaceWaiter<T> = Waiter<(Channel<T>, T)>;

/// Work produced under the lock and carried out after it is released.
pub(crate) enum Deferred<T> {
  /// Settle a taker and its putter with the same delivered payload.
  Pair {
    taker: Waiter<T>,
    putter: Waiter<T>,
    payload: Payload<T>,
  },
  /// Settle a select racer.
  Race { racer: RaceWaiter<T>, payload: Payload<T> },
  /// Put a payload on every piped output.
  Forward {
    outputs: Vec<Channel<T>>,
    transform: Option<Transform<T>>,
    payload: Payload<T>,
  },
  /// Close outputs detached from a closing input.
  Close(Vec<Channel<T>>),
  FailTaker(Waiter<T>, ChannelError),
  FailRacer(RaceWaiter<T>, ChannelError),
}

pub(crate) struct ChannelState<T> {
  pub(crate) messages: Box<dyn Buffer<Payload<T>>>,
  pub(crate) putters: RingBuffer<Waiter<T>>,
  pub(crate) takers: RingBuffer<Waiter<T>>,
  pub(crate) racers: RingBuffer<RaceWaiter<T>>,
  pub(crate) closed: bool,
  pub(crate) pipe_outs: Vec<Channel<T>>,
  pub(crate) pipe_close: bool,
  pub(crate) pipe_xf: Option<Transform<T>>,
}

impl<T> ChannelState<T> {
  pub(crate) fn new(messages: Box<dyn Buffer<Payload<T>>>) -> Self {
    ChannelState {
      messages,
      putters: RingBuffer::with_capacity(WAITER_QUEUE_CAPACITY),
      takers: RingBuffer::with_capacity(WAITER_QUEUE_CAPACITY),
      racers: RingBuffer::with_capacity(WAITER_QUEUE_CAPACITY),
      closed: false,
      pipe_outs: Vec::new(),
      pipe_close: true,
      pipe_xf: None,
    }
  }

  /// One matching pass. Steps 1 and 2 each move at most one payload and do
  /// not re-check each other; step 3 loops while a full triple is available.
  pub(crate) fn pump(&mut self, id: ChannelId, out: &mut Vec<Deferred<T>>) {
    telemetry::increment_counter(LOC_PUMP, CTR_PUMP_PASSES);

    if !self.racers.is_empty() && self.messages.count() > 0 {
      if let (Some(payload), Some(racer)) = (self.messages.remove(), self.racers.remove()) {
        telemetry::log_event(Some(id.as_u64()), LOC_PUMP, EVT_RACER_MATCHED, None);
        out.push(Deferred::Race { racer, payload });
      }
    }

    if !self.pipe_outs.is_empty() && self.messages.count() > 0 {
      if let Some(payload) = self.messages.remove() {
        telemetry::log_event(
          Some(id.as_u64()),
          LOC_PUMP,
          EVT_PIPE_FORWARD,
          Some(format!("outputs={}", self.pipe_outs.len())),
        );
        out.push(Deferred::Forward {
          outputs: self.pipe_outs.clone(),
          transform: self.pipe_xf.clone(),
          payload,
        });
      }
    }

    while !self.putters.is_empty() && !self.takers.is_empty() && self.messages.count() > 0 {
      let (Some(payload), Some(putter), Some(taker)) =
        (self.messages.remove(), self.putters.remove(), self.takers.remove())
      else {
        break;
      };
      telemetry::log_event(Some(id.as_u64()), LOC_PUMP, EVT_PAIR_MATCHED, None);
      telemetry::increment_counter(LOC_PUMP, CTR_PAIRS);
      out.push(Deferred::Pair { taker, putter, payload });
    }

    if self.closed {
      self.reject_unreachable(id, out);
    }
  }

  /// On a closed channel no new payloads arrive, so takers and racers still
  /// queued after a pump pass can never be matched.
  pub(crate) fn reject_unreachable(&mut self, id: ChannelId, out: &mut Vec<Deferred<T>>) {
    while let Some(taker) = self.takers.remove() {
      telemetry::log_event(Some(id.as_u64()), LOC_REJECT, EVT_REJECT_TAKER, None);
      out.push(Deferred::FailTaker(taker, ChannelError::Closed));
    }
    while let Some(racer) = self.racers.remove() {
      telemetry::log_event(Some(id.as_u64()), LOC_REJECT, EVT_REJECT_RACER, None);
      out.push(Deferred::FailRacer(racer, ChannelError::Closed));
    }
  }

  /// Detaches fan-out. Outputs are closed first when the pipe-close flag is
  /// set; the transform and flag return to their defaults.
  pub(crate) fn detach_pipes(&mut self, id: ChannelId, out: &mut Vec<Deferred<T>>) {
    let outputs = std::mem::take(&mut self.pipe_outs);
    if self.pipe_close && !outputs.is_empty() {
      telemetry::log_event(
        Some(id.as_u64()),
        LOC_DETACH,
        EVT_CASCADE_CLOSE,
        Some(format!("outputs={}", outputs.len())),
      );
      out.push(Deferred::Close(outputs));
    }
    self.pipe_xf = None;
    self.pipe_close = true;
  }
}

/// The shared owner of a channel, designed to be wrapped in an `Arc`.
pub(crate) struct ChannelShared<T> {
  pub(crate) id: ChannelId,
  /// Applied to every payload as it is delivered to a consumer.
  pub(crate) xf: Option<Transform<T>>,
  pub(crate) state: Mutex<ChannelState<T>>,
}

impl<T> ChannelShared<T> {
  pub(crate) fn new(messages: Box<dyn Buffer<Payload<T>>>, xf: Option<Transform<T>>) -> Self {
    ChannelShared {
      id: ChannelId::next(),
      xf,
      state: Mutex::new(ChannelState::new(messages)),
    }
  }

  /// Applies the output transform to a delivered payload.
  pub(crate) fn deliver(&self, payload: Payload<T>) -> Result<T, ChannelError> {
    match payload {
      Ok(value) => Ok(match &self.xf {
        Some(xf) => xf(value),
        None => value,
      }),
      Err(failure) => Err(ChannelError::Failed(failure)),
    }
  }
}

impl<T> Drop for ChannelShared<T> {
  fn drop(&mut self) {
    self.state.get_mut().messages.close_buffer();
  }
}

impl<T> fmt::Debug for ChannelShared<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("ChannelShared")
      .field("id", &self.id)
      .field("closed", &state.closed)
      .field("buffered", &state.messages.count())
      .field("putters", &state.putters.len())
      .field("takers", &state.takers.len())
      .field("racers", &state.racers.len())
      .field("pipe_outs", &state.pipe_outs.len())
      .finish_non_exhaustive()
  }
}
