//! Criterion benchmarks for the gamenet frame and message codecs.
//!
//! Measures the per-message cost of the receive path (cut frames out of an
//! accumulator, decode JSON) and the send path (encode JSON, add a frame
//! header), which both run once per message on the I/O side.
//!
//! Run with:
//! ```bash
//! cargo bench --package gamenet-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gamenet_core::protocol::{decode_message, encode_message, FrameCodec, Message, OperationCode};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_login() -> Message {
    Message::request(OperationCode::LOGIN, r#"{"uid":"bench-player"}"#, 1)
}

fn make_area_of_interest(entities: usize) -> Message {
    let ids: Vec<String> = (0..entities).map(|i| i.to_string()).collect();
    let payload = format!(r#"{{"enter":[{}],"leave":[]}}"#, ids.join(","));
    Message::event(OperationCode::AREA_OF_INTEREST, payload, 2)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_send_path(c: &mut Criterion) {
    let codec = FrameCodec::default();
    let mut group = c.benchmark_group("send_path");
    for (name, msg) in [("login", make_login()), ("aoi_64", make_area_of_interest(64))] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, msg| {
            b.iter(|| {
                let json = encode_message(black_box(msg)).expect("encode");
                codec.encode(&json).expect("frame")
            })
        });
    }
    group.finish();
}

fn bench_receive_path(c: &mut Criterion) {
    let codec = FrameCodec::default();
    let mut group = c.benchmark_group("receive_path");

    for batch in [1usize, 16, 128] {
        // One "socket read" containing `batch` coalesced frames.
        let bytes: Vec<u8> = (0..batch)
            .flat_map(|_| {
                codec
                    .encode(&encode_message(&make_area_of_interest(16)).expect("encode"))
                    .expect("frame")
            })
            .collect();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &bytes, |b, bytes| {
            b.iter(|| {
                let mut accumulator = bytes.clone();
                let mut count = 0;
                while let Some(frame) = codec.try_decode_one(&mut accumulator).expect("frame") {
                    black_box(decode_message(&frame).expect("decode"));
                    count += 1;
                }
                count
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_send_path, bench_receive_path);
criterion_main!(benches);
