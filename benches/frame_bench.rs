#![allow(clippy::unwrap_used, clippy::uninlined_format_args)]

use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mcproto::core::packet::{serialize, Frame};
use mcproto::protocol::packets::{standard_registry, PongResponse, StatusResponse};
use mcproto::protocol::ProtocolState;
use mcproto::transport::PacketIo;

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    let pong = PongResponse { timestamp: 123_456_789 };
    group.bench_function("serialize_pong", |b| b.iter(|| serialize(&pong, None).unwrap()));

    for size in [64usize, 1024, 16 * 1024] {
        let status = StatusResponse::new(&"a".repeat(size)).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        for threshold in [None, Some(256)] {
            let label = threshold.map_or("plain".to_string(), |t| format!("t{}", t));
            group.bench_function(format!("serialize_status_{}b_{}", size, label), |b| {
                b.iter(|| serialize(&status, threshold).unwrap())
            });

            let wire = serialize(&status, threshold).unwrap();
            group.bench_function(format!("parse_status_{}b_{}", size, label), |b| {
                b.iter(|| Frame::parse(&wire, threshold.is_some()).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_stream_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");
    let mut wire = Vec::new();
    for ts in 0..100i64 {
        wire.extend_from_slice(&serialize(&PongResponse { timestamp: ts }, None).unwrap());
    }
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("read_100_pongs", |b| {
        b.iter_batched(
            || {
                let mut io = PacketIo::new(Cursor::new(wire.clone()), standard_registry());
                io.set_state(ProtocolState::Status);
                io
            },
            |mut io| {
                for _ in 0..100 {
                    io.read().unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_frames, bench_stream_read);
criterion_main!(benches);
