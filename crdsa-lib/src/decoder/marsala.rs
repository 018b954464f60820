use tracing::{debug, trace};

use super::{FrameState, SicEngine};
use crate::frame::{DecodeMethod, FrameCollection, ReplicaRecord, ReplicaStatus};
use crate::link::linear_to_db;
use crate::prelude::*;
use crate::telemetry::Event;

/// Multi-replica correlation (MARSALA) on top of SIC.
///
/// Packets that SIC cannot resolve are retried with a SINR that combines the energy of all
/// of their replicas. Any packet decoded this way is cancelled from the frame and SIC runs
/// again, since that may unblock other packets.
pub struct Correlator<'a> {
    sic: SicEngine<'a>,
}

/// Passes performed by [Correlator::run].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Passes {
    pub sic: usize,
    pub correlation: usize,
}

impl<'a> Correlator<'a> {
    #[must_use]
    pub fn new(sic: SicEngine<'a>) -> Self {
        Self { sic }
    }

    /// Alternate SIC convergence and correlation passes until a correlation pass decodes
    /// nothing.
    ///
    /// # Errors
    /// See [SicEngine::decode_pass] and [Self::correlation_pass].
    pub fn run(
        &self,
        frame: &mut FrameCollection,
        decoded: &mut Vec<ReplicaRecord>,
    ) -> Result<Passes> {
        let mut passes = Passes::default();
        loop {
            debug!(state = %FrameState::Decoding, "running sic");
            passes.sic += self.sic.converge(frame, decoded)?;
            if frame.is_empty() {
                break;
            }
            debug!(
                state = %FrameState::Correlating,
                remaining = frame.replica_count(),
                "running correlation"
            );
            passes.correlation += 1;
            if !self.correlation_pass(frame, decoded)? {
                break;
            }
        }
        Ok(passes)
    }

    /// Attempt to decode one packet by combining all of its replicas.
    ///
    /// For a packet with `R` replicas occupying slots holding `N` records in total, the
    /// average number of interferers per replica is `N / R - 1` and the combined SINR is
    /// `R / (N / R - 1 + 1 / sinr)`, with `sinr` the SINR of the replica being visited.
    ///
    /// Returns `true` after the first success, which is appended to `decoded`.
    ///
    /// # Errors
    /// If a slot is empty, a visited packet's replicas are not where its replica plan
    /// says they are, or the link results cannot evaluate a candidate.
    pub fn correlation_pass(
        &self,
        frame: &mut FrameCollection,
        decoded: &mut Vec<ReplicaRecord>,
    ) -> Result<bool> {
        let occupied_slots = frame.occupied_slots() as u64;

        for slot in frame.slot_ids() {
            let count = frame.occupied(slot)?.len();
            for index in 0..count {
                let mut occupancy = count;
                let record = &frame.occupied(slot)?[index];
                for sibling in &record.siblings {
                    frame.replica_index(*sibling, record)?;
                    occupancy += frame.slot_len(*sibling);
                }

                let replicas = record.replica_count();
                let interferer_ratio = occupancy as f64 / replicas as f64 - 1.0;
                let sinr = frame.sinr(slot, index).ok_or(Error::EmptySlot(slot))?;
                self.sic.telemetry().record(Event::LinkSinr {
                    sinr_db: linear_to_db(sinr),
                });
                let combined = replicas as f64 / (interferer_ratio + 1.0 / sinr);

                trace!(
                    packet = %record.key,
                    replicas,
                    interferers = occupancy - replicas,
                    sinr,
                    combined,
                    "correlation candidate"
                );

                let decision = self.sic.link_results().evaluate(combined, &record.link)?;
                self.sic.telemetry().record(Event::Correlation {
                    trials: correlation_trials(occupied_slots, record.siblings.len() as u64),
                    source: record.source(),
                    success: decision.is_success(),
                });

                if let Some(record) = frame.record_mut(slot, index) {
                    record.composite_sinr = Some(combined);
                }

                if decision.is_success() {
                    let mut record = frame.remove_packet(slot, index)?;
                    record.status = ReplicaStatus::Decoded(DecodeMethod::Correlation);
                    debug!(packet = %record.key, slot, combined, "decoded by correlation");
                    decoded.push(record);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Diagnostic count reported with each correlation attempt: the product of the
/// `other_replicas` integers below `occupied_slots`.
#[must_use]
pub fn correlation_trials(occupied_slots: u64, other_replicas: u64) -> u64 {
    (occupied_slots.saturating_sub(other_replicas)..occupied_slots).fold(1, u64::saturating_mul)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{PacketKey, SignalQuality, SlotId, SourceId};
    use crate::link::SinrThreshold;
    use crate::telemetry::{MemorySink, NullSink};

    fn insert_packet(frame: &mut FrameCollection, source: SourceId, slots: &[(SlotId, f64)]) {
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
                    SignalQuality::new(*rx_power_w, 1.0),
                ))
                .unwrap();
        }
    }

    #[test]
    fn trials() {
        assert_eq!(correlation_trials(10, 0), 1);
        assert_eq!(correlation_trials(10, 1), 9);
        assert_eq!(correlation_trials(10, 2), 8 * 9);
        assert_eq!(correlation_trials(3, 5), 0);
        assert_eq!(correlation_trials(u64::MAX, 3), u64::MAX);
    }

    #[test]
    fn combines_weak_replicas() {
        // Three clean replicas at 1.5 (1.76dB) each. Alone they miss a 3dB threshold but
        // combined they give 3 / (0 + 1/1.5) = 4.5 (6.5dB).
        let oracle = SinrThreshold::new(3.0);
        let sink = MemorySink::default();
        let correlator = Correlator::new(SicEngine::new(&oracle, &sink));

        let mut frame = FrameCollection::new(8);
        insert_packet(&mut frame, 7, &[(1, 1.5), (4, 1.5), (6, 1.5)]);

        let mut decoded = Vec::new();
        let passes = correlator.run(&mut frame, &mut decoded).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[0].status,
            ReplicaStatus::Decoded(DecodeMethod::Correlation)
        );
        assert_eq!(decoded[0].slot, 1);
        assert!((decoded[0].composite_sinr.unwrap() - 4.5).abs() < 1e-9);
        assert!(frame.is_empty());
        assert_eq!(
            passes,
            Passes {
                sic: 2,
                correlation: 1
            }
        );

        let correlations: Vec<Event> = sink
            .take()
            .into_iter()
            .filter(|e| matches!(e, Event::Correlation { .. }))
            .collect();
        assert_eq!(
            correlations,
            vec![Event::Correlation {
                trials: 2,
                source: 7,
                success: true
            }]
        );
    }

    #[test]
    fn interferers_reduce_combined_sinr() {
        // Same packet as above, but every slot also holds another weak packet, so the
        // ratio of interferers per replica is 1 and combined is 3 / (1 + 1/sinr) < 3.
        let oracle = SinrThreshold::new(3.0);
        let correlator = Correlator::new(SicEngine::new(&oracle, &NullSink));

        let mut frame = FrameCollection::new(8);
        insert_packet(&mut frame, 7, &[(1, 1.5), (4, 1.5), (6, 1.5)]);
        insert_packet(&mut frame, 8, &[(1, 0.1), (4, 0.1), (6, 0.1)]);

        let mut decoded = Vec::new();
        assert!(!correlator.correlation_pass(&mut frame, &mut decoded).unwrap());
        assert!(decoded.is_empty());
        assert_eq!(frame.replica_count(), 6);
    }

    #[test]
    fn correlation_success_retriggers_sic() {
        // Packet 1 only decodes by correlation. Removing it from slot 3 leaves packet 2
        // clean there, which plain SIC then decodes.
        let oracle = SinrThreshold::new(3.0);
        let correlator = Correlator::new(SicEngine::new(&oracle, &NullSink));

        let mut frame = FrameCollection::new(8);
        insert_packet(&mut frame, 1, &[(0, 1.5), (2, 1.5), (3, 6.0)]);
        insert_packet(&mut frame, 2, &[(3, 10.0), (5, 0.1)]);

        let mut decoded = Vec::new();
        correlator.run(&mut frame, &mut decoded).unwrap();

        let got: Vec<_> = decoded.iter().map(|r| (r.source(), r.status)).collect();
        assert_eq!(
            got,
            vec![
                (1, ReplicaStatus::Decoded(DecodeMethod::Correlation)),
                (2, ReplicaStatus::Decoded(DecodeMethod::Sic)),
            ]
        );
        assert!(frame.is_empty());
    }

    #[test]
    fn missing_replica_is_fatal() {
        let oracle = SinrThreshold::new(3.0);
        let correlator = Correlator::new(SicEngine::new(&oracle, &NullSink));

        let mut frame = FrameCollection::new(8);
        frame
            .insert(ReplicaRecord::new(
                PacketKey::new(1, 0),
                0,
                vec![2],
                SignalQuality::new(0.1, 1.0),
            ))
            .unwrap();
        insert_packet(&mut frame, 2, &[(2, 0.1)]);

        let mut decoded = Vec::new();
        let zult = correlator.correlation_pass(&mut frame, &mut decoded);
        assert!(matches!(zult, Err(Error::MissingReplica { slot: 2, .. })));
    }
}
