use std::sync::Arc;

use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

use crdsa::decoder::{DecodePolicy, Decoder};
use crdsa::frame::{FrameCollection, PacketKey, ReplicaRecord, SignalQuality, SlotId};
use crdsa::link::SinrThreshold;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// Frame with `packets` packets of 3 replicas each at random slots and powers.
fn frame(slot_count: u16, packets: u64) -> FrameCollection {
    let mut rng = StdRng::seed_from_u64(packets);
    let mut frame = FrameCollection::new(slot_count);
    for source in 0..packets {
        let slots: Vec<SlotId> = sample(&mut rng, slot_count as usize, 3)
            .into_iter()
            .map(|s| s as SlotId)
            .collect();
        for slot in &slots {
            let siblings = slots.iter().copied().filter(|s| s != slot).collect();
            let signal = SignalQuality::new(rng.gen_range(0.5..20.0), 1.0);
            frame
                .insert(ReplicaRecord::new(
                    PacketKey::new(source, 0),
                    *slot,
                    siblings,
                    signal,
                ))
                .unwrap();
        }
    }
    frame
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for policy in [DecodePolicy::Sic, DecodePolicy::Marsala] {
        let decoder = Decoder::builder()
            .policy(policy)
            .link_results(Arc::new(SinrThreshold::new(3.0)))
            .build();
        for packets in [16u64, 64, 128] {
            let input = frame(256, packets);
            group.throughput(Throughput::Elements(packets));
            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), packets),
                &input,
                |b, input| {
                    b.iter(|| decoder.decode(input.clone()).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
