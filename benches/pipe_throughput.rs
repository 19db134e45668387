//! Pipe and harness benchmark suite.
//!
//! Benchmarks raw pipe throughput at different buffer capacities and
//! message round trips through an upgraded echo handler.
//!
//! Run with: cargo bench --bench pipe_throughput
//! Results saved to: target/criterion/

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;
use wstest::{Handler, Harness, Message, Request, ResponseWriter, Upgrader, pipe_pair};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PIPE_CAPACITIES: &[usize] = &[64, 1024, 16 * 1024];
const TRANSFER_BYTES: usize = 1024 * 1024;
const MESSAGE_SIZES: &[usize] = &[16, 1024, 64 * 1024];

// ============================================================================
// Benchmark: Raw Pipe Throughput
// ============================================================================

fn bench_pipe_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let payload = vec![0xa5u8; TRANSFER_BYTES];

    let mut group = c.benchmark_group("pipe_throughput");
    group.throughput(Throughput::Bytes(TRANSFER_BYTES as u64));

    for &capacity in PIPE_CAPACITIES {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                b.to_async(&rt)
                    .iter(|| transfer(capacity, payload.clone()));
            },
        );
    }

    group.finish();
}

async fn transfer(capacity: usize, payload: Vec<u8>) -> usize {
    let (mut server, mut client) = pipe_pair(capacity);

    let writer = tokio::spawn(async move {
        client.write_all(&payload).await.unwrap();
        client.close();
    });

    let mut sink = Vec::with_capacity(TRANSFER_BYTES);
    let n = server.read_to_end(&mut sink).await.unwrap();
    writer.await.unwrap();
    n
}

// ============================================================================
// Benchmark: Echo Round Trip
// ============================================================================

struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>) {
        let Ok(mut ws) = Upgrader::new().upgrade(writer, &request).await else {
            return;
        };
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() || ws.send(message).await.is_err() {
                break;
            }
        }
    }
}

fn bench_echo_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("echo_round_trip");

    for &size in MESSAGE_SIZES {
        let mut harness = rt.block_on(async {
            let mut harness = Harness::new();
            harness.connect(Echo).await.unwrap();
            harness
        });
        let payload = vec![0x5au8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("bytes", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    harness.send(Message::binary(payload.clone())).await.unwrap();
                    harness.receive().await.unwrap()
                })
            });
        });

        rt.block_on(harness.close()).unwrap();
    }

    group.finish();
}

criterion_group!(benches, bench_pipe_throughput, bench_echo_round_trip);
criterion_main!(benches);
