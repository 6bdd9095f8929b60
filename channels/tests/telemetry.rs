#![cfg(feature = "fibre_telemetry")]

use fibre_csp::{alts, chan, telemetry, PipeOptions};

use serial_test::serial;

mod common;

#[tokio::test]
#[serial]
async fn pump_records_matched_pairs() {
  telemetry::clear_telemetry();

  let ch = chan::<u32>();
  let _ = ch.put(1);
  assert_eq!(ch.take().await, Ok(1));

  assert_eq!(telemetry::counter("ChannelState::pump", "PairsMatched"), 1);
  assert!(telemetry::counter("ChannelState::pump", "PumpPasses") >= 2);

  let id = ch.id().as_u64();
  let events = telemetry::events();
  assert!(events
    .iter()
    .any(|e| e.channel_id == Some(id) && e.event_type == "Pump:PairMatched"));
  assert!(events.windows(2).all(|w| w[0].seq_id < w[1].seq_id));
}

#[tokio::test]
#[serial]
async fn close_cascade_and_select_are_recorded() {
  telemetry::clear_telemetry();

  let input = chan::<u32>();
  let output = chan::<u32>();
  input.pipe(&output, PipeOptions::new());
  let _ = input.put(3);
  let (winner, _) = alts(&[output.clone()]).await.unwrap();
  input.close();

  let events = telemetry::events();
  let seen = |chan: u64, evt: &str| events.iter().any(|e| e.channel_id == Some(chan) && e.event_type == evt);
  assert!(seen(input.id().as_u64(), "Pump:PipeForward"));
  assert!(seen(input.id().as_u64(), "Detach:CascadeClose"));
  assert!(seen(winner.id().as_u64(), "Alts:Winner"));
  assert!(seen(output.id().as_u64(), "Close:Closed"));
  assert_eq!(telemetry::counter("Alts::poll_round", "AltsRounds"), 1);

  telemetry::print_telemetry_report();
  telemetry::clear_telemetry();
  assert!(telemetry::events().is_empty());
}
