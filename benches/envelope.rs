//! Envelope and correlation benchmark suite.
//!
//! Benchmarks the hot path of every request:
//! - Id generation
//! - Envelope encode and decode
//! - Full request/response round trips at different in-flight counts
//!
//! Run with: cargo bench --bench envelope
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::{Arc, OnceLock};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

use markwhen_lpc::{
    ContextId, Envelope, Lpc, MessageId, MessageSink, MessageType, RawMessage, Result, Window,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const IN_FLIGHT: &[usize] = &[1, 16, 128];

// ============================================================================
// Benchmark: Identifiers
// ============================================================================

fn bench_id_generation(c: &mut Criterion) {
    c.bench_function("message_id_generate", |b| b.iter(MessageId::generate));
}

// ============================================================================
// Benchmark: Envelope Codec
// ============================================================================

fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    let envelope = Envelope::request(
        MessageType::SetText,
        MessageId::generate(),
        Some(json!({ "text": "2024-01: kickoff\n2024-03: launch", "at": { "from": 0, "to": 16 } })),
    );
    let text = serde_json::to_string(&envelope).expect("encode");

    group.bench_function("encode", |b| {
        b.iter(|| serde_json::to_string(black_box(&envelope)))
    });

    group.bench_function("decode", |b| {
        b.iter(|| serde_json::from_str::<Envelope>(black_box(&text)))
    });

    group.finish();
}

// ============================================================================
// Benchmark: Round Trips
// ============================================================================

/// Host that answers every request on the spot.
struct AnsweringHost {
    id: ContextId,
    view: OnceLock<Arc<Window>>,
}

impl MessageSink for AnsweringHost {
    fn post_message(&self, message: RawMessage) -> Result<()> {
        let Some(view) = self.view.get() else {
            return Ok(());
        };

        let mut data = message.data;
        data["request"] = json!(false);
        data["response"] = json!(true);
        data["params"] = json!({ "isDark": true });

        view.post_message(RawMessage::new(data, Some(self.id)))
    }
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let lpc = rt.block_on(async {
        let view = Arc::new(Window::new());
        let host = Arc::new(AnsweringHost {
            id: ContextId::new(),
            view: OnceLock::new(),
        });
        let _ = host.view.set(Arc::clone(&view));

        Lpc::builder()
            .window(view)
            .host(host)
            .connect()
            .await
            .expect("connect")
    });

    let mut group = c.benchmark_group("round_trip");

    for &count in IN_FLIGHT {
        group.bench_with_input(BenchmarkId::new("requests", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| {
                let responses: Vec<_> = (0..count)
                    .map(|_| lpc.send_request(MessageType::AppState, None))
                    .collect();
                futures_util::future::try_join_all(responses)
            });
        });
    }

    group.finish();
    lpc.close();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(
    benches,
    bench_id_generation,
    bench_envelope_codec,
    bench_round_trip
);
criterion_main!(benches);
