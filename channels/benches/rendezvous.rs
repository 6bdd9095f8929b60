use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

use fibre_csp::{alts, chan, Channel, PipeOptions};

const ITEM_VALUE: u64 = 42;
const ITEM_COUNTS: [usize; 2] = [100, 1_000];

// Every put is matched by one take in the same task.
async fn put_take_round_trips(items: usize) -> Duration {
  let ch = chan::<u64>();
  let start = Instant::now();
  for _ in 0..items {
    let put = ch.put(ITEM_VALUE);
    let _ = ch.take().await.unwrap();
    let _ = put.await.unwrap();
  }
  start.elapsed()
}

// Producer and consumer on separate tasks.
async fn spawned_producer(items: usize) -> Duration {
  let ch = chan::<u64>();
  let producer = ch.clone();
  let start = Instant::now();
  let handle = tokio::spawn(async move {
    for _ in 0..items {
      producer.put(ITEM_VALUE).await.unwrap();
    }
  });
  for _ in 0..items {
    let _ = ch.take().await.unwrap();
  }
  handle.await.unwrap();
  start.elapsed()
}

async fn piped_chain(items: usize) -> Duration {
  let input = chan::<u64>();
  let middle = chan::<u64>();
  let output = chan::<u64>();
  input.pipe(&middle, PipeOptions::new());
  middle.pipe(&output, PipeOptions::new());
  let start = Instant::now();
  for _ in 0..items {
    let _ = input.put(ITEM_VALUE);
    let _ = output.take().await.unwrap();
  }
  start.elapsed()
}

async fn select_over_four(items: usize) -> Duration {
  let channels: Vec<Channel<u64>> = (0..4).map(|_| chan()).collect();
  let start = Instant::now();
  for i in 0..items {
    let select = alts(&channels);
    let _ = channels[i % channels.len()].put(ITEM_VALUE);
    let _ = select.await.unwrap();
  }
  start.elapsed()
}

fn bench_rendezvous(c: &mut Criterion) {
  let rt = Runtime::new().expect("failed to build tokio runtime");
  let mut group = c.benchmark_group("Rendezvous");

  for &items in ITEM_COUNTS.iter() {
    group.throughput(Throughput::Elements(items as u64));

    group.bench_with_input(BenchmarkId::new("put_take", items), &items, |b, &items| {
      b.iter_custom(|iters| {
        (0..iters).map(|_| rt.block_on(put_take_round_trips(items))).sum()
      })
    });
    group.bench_with_input(BenchmarkId::new("spawned_producer", items), &items, |b, &items| {
      b.iter_custom(|iters| (0..iters).map(|_| rt.block_on(spawned_producer(items))).sum())
    });
    group.bench_with_input(BenchmarkId::new("pipe_chain", items), &items, |b, &items| {
      b.iter_custom(|iters| (0..iters).map(|_| rt.block_on(piped_chain(items))).sum())
    });
    group.bench_with_input(BenchmarkId::new("alts_4", items), &items, |b, &items| {
      b.iter_custom(|iters| (0..iters).map(|_| rt.block_on(select_over_four(items))).sum())
    });
  }
  group.finish();
}

criterion_group!(benches, bench_rendezvous);
criterion_main!(benches);
