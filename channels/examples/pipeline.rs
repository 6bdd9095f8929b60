// examples/pipeline.rs
use fibre_csp::{alts, chan, Channel, ChannelError, Message, PipeOptions};
use futures_util::StreamExt;
use std::time::Duration;

#[tokio::main]
async fn main() {
  println!("--- Pipe: uppercase stage feeding a logger ---");
  {
    let words = chan::<String>();
    let shouted = chan::<String>();
    words.pipe(&shouted, PipeOptions::new().transform(|w: String| w.to_uppercase()));

    let reader = shouted.clone();
    let logger = tokio::spawn(async move {
      let mut lines = reader.stream();
      while let Some(line) = lines.next().await {
        match line {
          Ok(line) => println!("[Logger] {}", line),
          Err(e) => println!("[Logger] upstream failed: {}", e),
        }
      }
      println!("[Logger] Channel closed.");
    });

    for w in ["hello", "csp", "world"] {
      let _ = words.put(w.to_string());
    }
    let _ = words.put(Message::failure(std::fmt::Error));
    tokio::time::sleep(Duration::from_millis(20)).await;
    words.close();
    logger.await.unwrap();
  }

  println!("\n--- Demux / Mux: two sources, three sinks ---");
  {
    let left = chan::<u32>();
    let right = chan::<u32>();
    let hub = chan::<u32>().demux(&[left.clone(), right.clone()], false);
    let sinks: Vec<Channel<u32>> = (0..3).map(|_| chan()).collect();
    hub.mux(&sinks, false);

    let _ = left.put(1);
    let _ = right.put(2);
    for (i, sink) in sinks.iter().enumerate() {
      let a = sink.take().await.unwrap();
      let b = sink.take().await.unwrap();
      println!("[Sink {}] received {} then {}", i, a, b);
    }
    left.close();
    println!("Sinks closed after left closed: {}", sinks.iter().all(Channel::is_closed));
  }

  println!("\n--- Alts: data versus timeout ---");
  {
    let data = chan::<&str>();
    let timeout = chan::<&str>();
    let ticker = timeout.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      let _ = ticker.put("tick");
    });

    match alts(&[data.clone(), timeout.clone()]).await {
      Ok((winner, value)) if winner == timeout => println!("[Alts] timed out ({})", value),
      Ok((_, value)) => println!("[Alts] got data: {}", value),
      Err(ChannelError::Closed) => println!("[Alts] closed"),
      Err(e) => println!("[Alts] failed: {}", e),
    }
  }
}
