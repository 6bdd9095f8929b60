#![warn(missing_debug_implementations, rust_2018_idioms)]

//! CSP-style channels for async Rust.
//!
//! A [`Channel`] is a buffered, closable rendezvous port. Producers `put`
//! values and consumers `take` them; every pending call is a waiter that the
//! channel's pump pairs with buffered values in FIFO order. On top of that:
//!
//! - **Buffer policies** ([`buffer`]): fixed, dropping (drop newest) and sliding (drop oldest).
//! - **Transforms**: a channel may map every value as it is delivered.
//! - **Composition**: [`Channel::pipe`], fan-in with [`Channel::demux`], fan-out with [`Channel::mux`].
//! - **Select**: [`alts`] races several channels and cancels the losers.
//! - **Non-blocking forms**: [`Channel::stake`] and [`Channel::sput`].
//!
//! The crate does not depend on a particular executor; settlements are plain
//! [`Future`](std::future::Future)s.
//!
//! ```
//! use fibre_csp::{chan, ops};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let input = chan::<u32>();
//! let output = chan::<u32>();
//! ops::pipe(&input, &output, Default::default());
//!
//! let _ = input.put(7);
//! assert_eq!(ops::take(&output).await, Ok(7));
//!
//! input.close();
//! assert!(output.is_closed());
//! # });
//! ```

pub mod buffer;
pub mod chan;
pub mod error;
pub mod id;
pub mod ops;
pub mod select;
pub mod stream;
pub mod telemetry;

// Internal utilities - not part of public API but exposed for crate use
mod internal;

pub use buffer::{dropping, fixed, ring, sliding, Buffer};
pub use chan::{chan, Channel, ChannelBuilder, Message, Payload, PipeOptions, Transform, WaitCounts};
pub use error::{ChannelError, InvalidCapacity, PayloadFailure, TryTakeError};
pub use id::ChannelId;
pub use internal::waiter::Settlement;
pub use select::{alts, Alts, Selected};
pub use stream::Takes;

// Helper function to check if a type is Send + Sync.
#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(dead_code)]
fn handles_are_send_sync() {
  assert_send_sync::<Channel<String>>();
  assert_send_sync::<Settlement<String>>();
  assert_send_sync::<Alts<String>>();
  assert_send_sync::<Takes<String>>();
}
