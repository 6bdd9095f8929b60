//! Pointfree forms of the channel operations, taking the channel first.
//!
//! These mirror the methods on [`Channel`] for use where a plain function is
//! more convenient, e.g. when passing an operation to a combinator.

use crate::chan::{Channel, Message, PipeOptions};
use crate::error::TryTakeError;
use crate::internal::waiter::Settlement;
use crate::stream::Takes;

pub use crate::select::alts;

pub fn close<T: Clone + Send + 'static>(ch: &Channel<T>) {
  ch.close()
}

pub fn is_closed<T>(ch: &Channel<T>) -> bool {
  ch.is_closed()
}

pub fn put<T: Clone + Send + 'static>(ch: &Channel<T>, message: impl Into<Message<T>>) -> Settlement<T> {
  ch.put(message)
}

pub fn sput<T: Clone + Send + 'static>(ch: &Channel<T>, message: impl Into<Message<T>>) -> bool {
  ch.sput(message)
}

pub fn stake<T: Clone + Send + 'static>(ch: &Channel<T>) -> Result<T, TryTakeError> {
  ch.stake()
}

/// Registers a take right away and returns it as the head of a take
/// sequence. Await it for one value, or poll it as a stream for many.
pub fn take<T: Clone + Send + 'static>(ch: &Channel<T>) -> Takes<T> {
  Takes::eager(ch.clone())
}

pub fn pipe<T: Clone + Send + 'static>(input: &Channel<T>, output: &Channel<T>, options: PipeOptions<T>) {
  input.pipe(output, options)
}

pub fn demux<T: Clone + Send + 'static>(ch: &Channel<T>, inputs: &[Channel<T>], keep_open: bool) -> Channel<T> {
  ch.demux(inputs, keep_open)
}

pub fn mux<T: Clone + Send + 'static>(ch: &Channel<T>, outputs: &[Channel<T>], keep_open: bool) {
  ch.mux(outputs, keep_open)
}
