use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pasta_core::config::ChannelConfig;
use pasta_core::{Channel, EventLedger, Message};

/// Synthetic chat: `senders` users cycling through `texts` distinct lines,
/// one message per 50ms.
fn synthetic_chat(count: usize, senders: usize, texts: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let millis = i64::try_from(i).unwrap_or(i64::MAX) * 50;
            Message::new(
                Utc.timestamp_millis_opt(millis).unwrap(),
                format!("m{i}"),
                format!("user{}", i % senders),
                format!("line {}", (i / 3) % texts),
            )
        })
        .collect()
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for count in [1_000_usize, 20_000] {
        let chat = synthetic_chat(count, 40, 25);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("ledger.add", count), &chat, |b, chat| {
            b.iter(|| {
                let ledger = EventLedger::new();
                for msg in chat {
                    ledger.add(msg.at, msg.id.as_str(), msg.sender.as_str(), msg.text.as_str());
                }
                black_box(ledger.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("channel.ingest", count), &chat, |b, chat| {
            b.iter(|| {
                let channel = Channel::new(
                    "#bench",
                    &ChannelConfig {
                        need: 3,
                        within: Duration::from_secs(30),
                        learn: true,
                    },
                );
                let flagged = chat.iter().filter(|msg| channel.ingest(msg).is_flagged()).count();
                black_box(flagged)
            });
        });

        group.bench_with_input(BenchmarkId::new("ledger.all", count), &chat, |b, chat| {
            let ledger = EventLedger::new();
            for msg in chat {
                ledger.add(msg.at, msg.id.as_str(), msg.sender.as_str(), ());
            }
            b.iter(|| black_box(ledger.all().count()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
