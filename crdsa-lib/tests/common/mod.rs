use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

use crdsa::frame::{FrameCollection, PacketKey, ReplicaRecord, SignalQuality, SlotId, SourceId};

pub const NOISE_W: f64 = 1.0;

/// Insert a replica of packet `source` in each of `slots` with the given received power.
pub fn insert_packet(frame: &mut FrameCollection, source: SourceId, slots: &[(SlotId, f64)]) {
    for (slot, rx_power_w) in slots {
        let siblings: Vec<SlotId> = slots
            .iter()
            .map(|(s, _)| *s)
            .filter(|s| s != slot)
            .collect();
        frame
            .insert(ReplicaRecord::new(
                PacketKey::new(source, 0),
                *slot,
                siblings,
                SignalQuality::new(*rx_power_w, NOISE_W),
            ))
            .expect("replica to be valid");
    }
}

/// A frame of `packets` packets with 1 to 3 replicas each placed at random.
pub fn random_frame(seed: u64, slot_count: u16, packets: usize) -> FrameCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut frame = FrameCollection::new(slot_count);
    for source in 0..packets {
        let replicas = rng.gen_range(1..=3);
        let slots: Vec<(SlotId, f64)> = sample(&mut rng, slot_count as usize, replicas)
            .into_iter()
            .map(|slot| (slot as SlotId, rng.gen_range(0.5..20.0)))
            .collect();
        insert_packet(&mut frame, source as SourceId, &slots);
    }
    frame
}
