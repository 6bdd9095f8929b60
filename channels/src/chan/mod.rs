// src/chan/mod.rs

//! The rendezvous channel.
//!
//! A [`Channel`] is a cloneable handle; every clone talks to the same buffer
//! and queues. Producers `put` payloads, consumers `take` them, and select
//! participants `race` for them. Each of those calls registers a waiter and
//! runs the pump, which pairs waiters with buffered payloads.
//!
//! Matched waiters are settled after the channel's lock is released, in the
//! order the pump matched them. A task awaiting a [`Settlement`] sees its
//! result on its next poll, never inside the producer's call.
//!
//! ```
//! use fibre_csp::chan;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let ch = chan::<&str>();
//! let put = ch.put("x");
//! assert_eq!(ch.take().await, Ok("x"));
//! assert_eq!(put.await, Ok("x"));
//! assert_eq!(ch.len(), 0);
//! # });
//! ```

mod builder;
pub(crate) mod core;

pub use builder::ChannelBuilder;

use self::core::{ChannelShared, ChannelState, Deferred};
use crate::buffer::{Buffer, FixedBuffer};
use crate::error::{ChannelError, PayloadFailure, TryTakeError};
use crate::id::ChannelId;
use crate::internal::waiter::{waiter, Settlement};
use crate::stream::Takes;
use crate::telemetry;

use parking_lot::MutexGuard;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Nominal size of the fixed buffer used when none is given.
pub const DEFAULT_BUFFER_CAPACITY: NonZeroUsize = match NonZeroUsize::new(32) {
  Some(n) => n,
  None => unreachable!(),
};

/// What sits in a channel's buffer: a value, or a producer-side failure.
pub type Payload<T> = Result<T, PayloadFailure>;

/// A shared value-to-value function, used for output and pipe transforms.
pub type Transform<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

const LOC_PUT: &str = "Channel::put";
const LOC_RACE: &str = "Channel::race";
const LOC_CANCEL: &str = "Channel::cancel_race";
const LOC_CLOSE: &str = "Channel::close";
const LOC_STAKE: &str = "Channel::stake";
const LOC_SPUT: &str = "Channel::sput";

const EVT_PUT_CLOSED: &str = "Put:AfterClose";
const EVT_PUT_END: &str = "Put:EndMarker";
const EVT_RACE_IMMEDIATE: &str = "Race:ConsumedBuffered";
const EVT_CANCELLED: &str = "Cancel:RacerFailed";
const EVT_CLOSED: &str = "Close:Closed";
const EVT_STAKE_OK: &str = "Stake:Matched";
const EVT_SPUT_OK: &str = "Sput:Delivered";
const EVT_SPUT_DROPPED: &str = "Sput:NoTaker";

/// What a producer hands to [`Channel::put`] or [`Channel::sput`].
///
/// Plain values convert through `From`, so `ch.put(5)` works directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
  /// An ordinary value.
  Value(T),
  /// A failure delivered to whichever waiter receives it.
  Failure(PayloadFailure),
  /// The end-of-stream marker. Putting it closes the channel.
  End,
}

impl<T> Message<T> {
  /// Wraps an error as a failure message.
  pub fn failure<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Message::Failure(PayloadFailure::new(error))
  }
}

impl<T> From<T> for Message<T> {
  fn from(value: T) -> Self {
    Message::Value(value)
  }
}

/// Options for [`Channel::pipe`].
pub struct PipeOptions<T> {
  keep_open: bool,
  transform: Option<Transform<T>>,
}

impl<T> Default for PipeOptions<T> {
  fn default() -> Self {
    PipeOptions {
      keep_open: false,
      transform: None,
    }
  }
}

impl<T> fmt::Debug for PipeOptions<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PipeOptions")
      .field("keep_open", &self.keep_open)
      .field("has_transform", &self.transform.is_some())
      .finish()
  }
}

impl<T> PipeOptions<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// When set, closing the input leaves its outputs open.
  pub fn keep_open(mut self, keep_open: bool) -> Self {
    self.keep_open = keep_open;
    self
  }

  /// Transform applied to every forwarded value. The input holds a single
  /// pipe transform shared by all its outputs; the last one given wins.
  pub fn transform(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
    self.transform = Some(Arc::new(f));
    self
  }
}

/// Snapshot of a channel's queue depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitCounts {
  pub putters: usize,
  pub takers: usize,
  pub racers: usize,
}

/// A CSP channel handle. Clones share the same channel.
pub struct Channel<T> {
  shared: Arc<ChannelShared<T>>,
}

impl<T> Clone for Channel<T> {
  fn clone(&self) -> Self {
    Channel {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> fmt::Debug for Channel<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Channel").field("shared", &self.shared).finish()
  }
}

impl<T> PartialEq for Channel<T> {
  fn eq(&self, other: &Self) -> bool {
    self.shared.id == other.shared.id
  }
}
impl<T> Eq for Channel<T> {}

impl<T> Hash for Channel<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.shared.id.hash(state);
  }
}

/// Creates a channel with the default fixed buffer and no transform.
pub fn chan<T: Clone + Send + 'static>() -> Channel<T> {
  Channel::with_buffer(FixedBuffer::new(DEFAULT_BUFFER_CAPACITY))
}

impl<T: Clone + Send + 'static> Default for Channel<T> {
  fn default() -> Self {
    chan()
  }
}

impl<T> Channel<T> {
  /// The channel's process-unique id.
  #[inline]
  pub fn id(&self) -> ChannelId {
    self.shared.id
  }

  pub fn is_closed(&self) -> bool {
    self.shared.state.lock().closed
  }

  /// Number of buffered payloads.
  pub fn len(&self) -> usize {
    self.shared.state.lock().messages.count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drops the racer queued for `race`, if it is still queued.
  pub(crate) fn withdraw_race(&self, race: &Settlement<(Channel<T>, T)>) {
    self.shared.state.lock().racers.cleanup(|racer| !racer.belongs_to(race));
  }

  /// Drops the taker queued for `take`, if it is still queued.
  pub(crate) fn withdraw_take(&self, take: &Settlement<T>) {
    self.shared.state.lock().takers.cleanup(|taker| !taker.belongs_to(take));
  }

  /// Current depths of the putter, taker and racer queues.
  pub fn waiting(&self) -> WaitCounts {
    let state = self.shared.state.lock();
    WaitCounts {
      putters: state.putters.len(),
      takers: state.takers.len(),
      racers: state.racers.len(),
    }
  }
}

impl<T: Clone + Send + 'static> Channel<T> {
  /// Creates a channel over `buffer` whose consumers receive `transform(value)`.
  pub fn new<B, F>(buffer: B, transform: F) -> Self
  where
    B: Buffer<Payload<T>> + 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
  {
    Self::from_parts(Box::new(buffer), Some(Arc::new(transform)))
  }

  pub fn with_buffer<B>(buffer: B) -> Self
  where
    B: Buffer<Payload<T>> + 'static,
  {
    Self::from_parts(Box::new(buffer), None)
  }

  /// Creates a channel with the default buffer and an output transform.
  pub fn with_transform<F>(transform: F) -> Self
  where
    F: Fn(T) -> T + Send + Sync + 'static,
  {
    Self::new(FixedBuffer::new(DEFAULT_BUFFER_CAPACITY), transform)
  }

  pub fn builder() -> ChannelBuilder<T> {
    ChannelBuilder::new()
  }

  pub(crate) fn from_parts(buffer: Box<dyn Buffer<Payload<T>>>, xf: Option<Transform<T>>) -> Self {
    Channel {
      shared: Arc::new(ChannelShared::new(buffer, xf)),
    }
  }

  /// Buffers a payload and registers a putter.
  ///
  /// The returned settlement resolves with the transformed value once a
  /// consumer has received it. The payload is enqueued before this returns;
  /// dropping the settlement does not withdraw it.
  ///
  /// Putting [`Message::End`] closes the channel and returns a settlement
  /// already failed with [`ChannelError::Closed`]. Any other message is
  /// buffered even when the channel is closed, so values piped into a closed
  /// output stay drainable.
  pub fn put(&self, message: impl Into<Message<T>>) -> Settlement<T> {
    let payload = match message.into() {
      Message::Value(value) => Ok(value),
      Message::Failure(failure) => Err(failure),
      Message::End => {
        telemetry::log_event(Some(self.id().as_u64()), LOC_PUT, EVT_PUT_END, None);
        self.close();
        return Settlement::ready(Err(ChannelError::Closed));
      }
    };

    let (putter, settlement) = waiter();
    let deferred = {
      let mut state = self.shared.state.lock();
      if state.closed {
        telemetry::log_event(Some(self.id().as_u64()), LOC_PUT, EVT_PUT_CLOSED, None);
      }
      state.messages.add(payload);
      state.putters.unbounded_add(putter);
      self.pump_locked(&mut state, Vec::new())
    };
    self.run_deferred(deferred);
    settlement
  }

  /// Registers a taker. Resolves with the next transformed value delivered to
  /// it; takers are served in the order they registered.
  pub fn take(&self) -> Settlement<T> {
    let (taker, settlement) = waiter();
    let deferred = {
      let mut state = self.shared.state.lock();
      state.takers.unbounded_add(taker);
      self.pump_locked(&mut state, Vec::new())
    };
    self.run_deferred(deferred);
    settlement
  }

  /// Registers a select participant. Resolves with `(channel, value)`.
  ///
  /// If a payload is already buffered it is consumed for this call right away.
  /// A racer record is registered regardless, sharing this call's settlement.
  /// When the call was already served from the buffer that record is stale,
  /// and whatever payload it is matched with is discarded. That can happen in
  /// this same call: the pump runs after registration, so if a second payload
  /// is buffered the stale record consumes it at once. Otherwise it stays
  /// queued and swallows a later payload. [`alts`](crate::alts) cancels
  /// racers on the losing channels only.
  pub fn race(&self) -> Settlement<(Channel<T>, T)> {
    let (racer, settlement) = waiter();
    let deferred = {
      let mut state = self.shared.state.lock();
      let mut out = Vec::new();
      if let Some(payload) = state.messages.remove() {
        telemetry::log_event(Some(self.id().as_u64()), LOC_RACE, EVT_RACE_IMMEDIATE, None);
        out.push(Deferred::Race {
          racer: racer.clone(),
          payload,
        });
      }
      state.racers.unbounded_add(racer);
      self.pump_locked(&mut state, out)
    };
    self.run_deferred(deferred);
    settlement
  }

  /// Takes without waiting.
  ///
  /// Succeeds only when a buffered payload and a pending putter both exist:
  /// one of each is removed, the putter is settled before this returns, and the
  /// transformed value is handed back. Otherwise returns
  /// [`TryTakeError::Empty`] and changes nothing.
  pub fn stake(&self) -> Result<T, TryTakeError> {
    let (payload, putter) = {
      let mut state = self.shared.state.lock();
      if state.messages.count() == 0 || state.putters.is_empty() {
        return Err(TryTakeError::Empty);
      }
      match (state.messages.remove(), state.putters.remove()) {
        (Some(payload), Some(putter)) => (payload, putter),
        _ => return Err(TryTakeError::Empty),
      }
    };
    telemetry::log_event(Some(self.id().as_u64()), LOC_STAKE, EVT_STAKE_OK, None);

    match self.shared.deliver(payload) {
      Ok(value) => {
        putter.fulfill(value.clone());
        Ok(value)
      }
      Err(error) => {
        putter.fail(error.clone());
        match error {
          ChannelError::Failed(failure) => Err(TryTakeError::Failed(failure)),
          _ => Err(TryTakeError::Empty),
        }
      }
    }
  }

  /// Puts without waiting.
  ///
  /// Succeeds only when a taker is pending: it is settled with the transformed
  /// value before this returns, and `true` is returned. Otherwise the message
  /// is dropped and `false` is returned. [`Message::End`] closes the channel.
  pub fn sput(&self, message: impl Into<Message<T>>) -> bool {
    let payload = match message.into() {
      Message::Value(value) => Ok(value),
      Message::Failure(failure) => Err(failure),
      Message::End => {
        self.close();
        return false;
      }
    };

    let taker = self.shared.state.lock().takers.remove();
    match taker {
      Some(taker) => {
        telemetry::log_event(Some(self.id().as_u64()), LOC_SPUT, EVT_SPUT_OK, None);
        taker.settle(self.shared.deliver(payload));
        true
      }
      None => {
        telemetry::log_event(Some(self.id().as_u64()), LOC_SPUT, EVT_SPUT_DROPPED, None);
        false
      }
    }
  }

  /// Removes the oldest pending racer, if any, and fails it with
  /// [`ChannelError::Cancelled`].
  pub fn cancel_race(&self) {
    let racer = self.shared.state.lock().racers.remove();
    if let Some(racer) = racer {
      telemetry::log_event(Some(self.id().as_u64()), LOC_CANCEL, EVT_CANCELLED, None);
      racer.fail(ChannelError::Cancelled);
    }
  }

  /// Closes the channel. Idempotent.
  ///
  /// Piped outputs are closed too unless they were attached with `keep_open`,
  /// then all piping is detached. Pending takers and racers are failed with
  /// [`ChannelError::Closed`]. Already buffered payloads stay drainable, so
  /// their putters remain pending until a consumer takes them.
  pub fn close(&self) {
    let deferred = {
      let mut state = self.shared.state.lock();
      if !state.closed {
        telemetry::log_event(Some(self.id().as_u64()), LOC_CLOSE, EVT_CLOSED, None);
      }
      state.closed = true;
      let mut out = Vec::new();
      state.detach_pipes(self.id(), &mut out);
      state.reject_unreachable(self.id(), &mut out);
      out
    };
    self.run_deferred(deferred);
  }

  /// Adds `output` as a forwarding target.
  ///
  /// Every payload that reaches the pipe step of the pump is put on all
  /// outputs. `keep_open` stops closing this channel from closing the outputs;
  /// it is never switched back on by a later `pipe`.
  pub fn pipe(&self, output: &Channel<T>, options: PipeOptions<T>) {
    let mut state = self.shared.state.lock();
    state.pipe_outs.push(output.clone());
    if options.keep_open {
      state.pipe_close = false;
    }
    if let Some(transform) = options.transform {
      state.pipe_xf = Some(transform);
    }
  }

  /// Fan-in: pipes every input into this channel. Returns this channel.
  pub fn demux(&self, inputs: &[Channel<T>], keep_open: bool) -> Channel<T> {
    for input in inputs {
      input.pipe(self, PipeOptions::new().keep_open(keep_open));
    }
    self.clone()
  }

  /// Fan-out: broadcasts this channel's values to every output.
  ///
  /// Each call sets the shared close-cascade flag from `keep_open`.
  pub fn mux(&self, outputs: &[Channel<T>], keep_open: bool) {
    let mut state = self.shared.state.lock();
    state.pipe_outs.extend(outputs.iter().cloned());
    state.pipe_close = !keep_open;
  }

  /// Detaches all piped outputs, closing them first unless `keep_open` was
  /// requested. Resets the pipe transform.
  pub fn unpipe(&self) {
    let deferred = {
      let mut state = self.shared.state.lock();
      let mut out = Vec::new();
      state.detach_pipes(self.id(), &mut out);
      out
    };
    self.run_deferred(deferred);
  }

  /// The channel as a stream of takes. Nothing is registered until the first
  /// poll; the stream ends once the channel reports it is closed.
  pub fn stream(&self) -> Takes<T> {
    Takes::lazy(self.clone())
  }

  fn pump_locked(
    &self,
    state: &mut MutexGuard<'_, ChannelState<T>>,
    mut out: Vec<Deferred<T>>,
  ) -> Vec<Deferred<T>> {
    state.pump(self.id(), &mut out);
    out
  }

  // Runs with the lock released, in the order the actions were produced.
  fn run_deferred(&self, actions: Vec<Deferred<T>>) {
    for action in actions {
      match action {
        Deferred::Pair {
          taker,
          putter,
          payload,
        } => match self.shared.deliver(payload) {
          Ok(value) => {
            taker.fulfill(value.clone());
            putter.fulfill(value);
          }
          Err(error) => {
            taker.fail(error.clone());
            putter.fail(error);
          }
        },
        Deferred::Race { racer, payload } => {
          racer.settle(self.shared.deliver(payload).map(|value| (self.clone(), value)));
        }
        Deferred::Forward {
          outputs,
          transform,
          payload,
        } => {
          let message = match payload {
            Ok(value) => Message::Value(match &transform {
              Some(xf) => xf(value),
              None => value,
            }),
            Err(failure) => Message::Failure(failure),
          };
          for output in &outputs {
            // Forwarded puts are fire-and-forget.
            let _ = output.put(message.clone());
          }
        }
        Deferred::Close(outputs) => {
          for output in &outputs {
            output.close();
          }
        }
        Deferred::FailTaker(taker, error) => {
          taker.fail(error);
        }
        Deferred::FailRacer(racer, error) => {
          racer.fail(error);
        }
      }
    }
  }
}
