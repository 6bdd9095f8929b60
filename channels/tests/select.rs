use fibre_csp::{alts, chan, ops, ChannelError, Message};

use futures_util::StreamExt;
use tokio::time::{sleep, timeout};

mod common;
use common::*;

#[tokio::test]
async fn race_resolves_with_channel_and_value() {
  let ch = chan::<&str>();
  let race = ch.race();
  let _ = ch.put("foo");
  let (winner, value) = timeout(SHORT_TIMEOUT, race).await.unwrap().unwrap();
  assert_eq!(winner, ch);
  assert_eq!(value, "foo");
}

#[tokio::test]
async fn cancel_race_fails_the_oldest_racer() {
  let ch = chan::<u8>();
  ch.cancel_race();

  let first = ch.race();
  let second = ch.race();
  ch.cancel_race();
  assert_eq!(first.await.map(|(_, v)| v), Err(ChannelError::Cancelled));
  assert!(!second.is_settled());

  let _ = ch.put(9);
  assert_eq!(second.await.map(|(_, v)| v), Ok(9));
}

#[tokio::test]
async fn alts_picks_the_channel_that_delivers() {
  let a = chan::<&str>();
  let b = chan::<&str>();
  let select = alts(&[a.clone(), b.clone()]);
  let _ = a.put("foo");

  let (winner, value) = timeout(SHORT_TIMEOUT, select).await.unwrap().unwrap();
  assert_eq!(winner.id(), a.id());
  assert_eq!(value, "foo");
  assert_eq!(a.waiting().racers, 0);
  assert_eq!(b.waiting().racers, 0);
}

#[tokio::test]
async fn alts_loser_does_not_swallow_later_values() {
  let a = chan::<u32>();
  let b = chan::<u32>();
  let _ = b.put(5);

  let (winner, value) = alts(&[a.clone(), b.clone()]).await.unwrap();
  assert_eq!(winner, b);
  assert_eq!(value, 5);

  let put = a.put(1);
  assert_eq!(a.take().await, Ok(1));
  assert_eq!(put.await, Ok(1));
}

#[tokio::test]
async fn alts_prefers_the_earliest_delivery() {
  let a = chan::<u32>();
  let b = chan::<u32>();
  let select = alts(&[a.clone(), b.clone()]);
  // Both settle before the select is polled; b settled first.
  let _ = b.put(1);
  let _ = a.put(2);

  let (winner, value) = timeout(SHORT_TIMEOUT, select).await.unwrap().unwrap();
  assert_eq!(winner, b);
  assert_eq!(value, 1);
}

#[tokio::test]
async fn dropped_alts_withdraws_its_racers() {
  let a = chan::<u32>();
  let b = chan::<u32>();
  assert!(timeout(SETTLE_DELAY, alts(&[a.clone(), b.clone()])).await.is_err());
  assert_eq!(a.waiting().racers, 0);
  assert_eq!(b.waiting().racers, 0);

  let _ = a.put(7);
  assert_eq!(timeout(SHORT_TIMEOUT, a.take()).await.unwrap(), Ok(7));
}

#[tokio::test]
async fn dropped_take_sequence_withdraws_its_take() {
  let ch = chan::<u32>();
  assert!(timeout(SETTLE_DELAY, ops::take(&ch)).await.is_err());
  assert_eq!(ch.waiting().takers, 0);

  let _ = ch.put(3);
  assert_eq!(ch.stake(), Ok(3));
}

#[tokio::test]
#[should_panic(expected = "Alts polled after completion")]
async fn alts_future_is_not_restarted_after_completion() {
  let a = chan::<u8>();
  let _ = a.put(1);
  let mut select = alts(&[a.clone()]);
  assert_eq!((&mut select).await.map(|(_, v)| v), Ok(1));
  let _ = (&mut select).await;
}

#[tokio::test]
#[should_panic(expected = "Takes polled after completion")]
async fn take_future_is_not_restarted_after_completion() {
  let ch = chan::<u8>();
  let _ = ch.put(1);
  let mut take = ops::take(&ch);
  assert_eq!((&mut take).await, Ok(1));
  let _ = (&mut take).await;
}

#[tokio::test]
async fn alts_with_a_timeout_channel() {
  let data = chan::<&str>();
  let timer = chan::<&str>();
  let ticker = timer.clone();
  tokio::spawn(async move {
    sleep(SETTLE_DELAY).await;
    let _ = ticker.put("timeout");
  });

  let (winner, value) = timeout(LONG_TIMEOUT, ops::alts(&[data.clone(), timer.clone()]))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(winner, timer);
  assert_eq!(value, "timeout");
  assert_eq!(data.waiting().racers, 0);
}

#[tokio::test]
async fn alts_reports_failures() {
  let ch = chan::<u32>();
  let _ = ch.put(Message::failure(Boom));
  assert!(matches!(alts(&[ch.clone()]).await, Err(ChannelError::Failed(_))));
}

#[tokio::test]
async fn alts_stream_runs_a_round_per_item() {
  let a = chan::<&str>();
  let b = chan::<&str>();
  let _ = a.put("foo");
  let late = b.clone();
  tokio::spawn(async move {
    sleep(SETTLE_DELAY).await;
    let _ = late.put("bar");
  });

  let mut rounds = alts(&[a.clone(), b.clone()]);
  let (first, v1) = timeout(SHORT_TIMEOUT, rounds.next()).await.unwrap().unwrap().unwrap();
  assert_eq!((first, v1), (a.clone(), "foo"));
  let (second, v2) = timeout(SHORT_TIMEOUT, rounds.next()).await.unwrap().unwrap().unwrap();
  assert_eq!((second, v2), (b.clone(), "bar"));
}

#[tokio::test]
async fn alts_stream_ends_when_closed() {
  let a = chan::<u8>();
  let b = chan::<u8>();
  a.close();
  b.close();
  let mut rounds = alts(&[a, b]);
  assert!(timeout(SHORT_TIMEOUT, rounds.next()).await.unwrap().is_none());
  assert!(rounds.next().await.is_none());
}

#[tokio::test]
async fn alts_over_nothing_never_resolves() {
  let select = alts::<u8>(&[]);
  assert!(timeout(SETTLE_DELAY, select).await.is_err());
}

#[tokio::test]
async fn take_sequence_as_future_and_stream() {
  let ch = chan::<&str>();
  let _ = ch.put("bar");
  assert_eq!(ops::take(&ch).await, Ok("bar"));

  for v in ["a", "b", "c"] {
    let _ = ops::put(&ch, v);
  }
  let values: Vec<_> = ops::take(&ch).take(3).collect().await;
  assert_eq!(values, vec![Ok("a"), Ok("b"), Ok("c")]);
}
