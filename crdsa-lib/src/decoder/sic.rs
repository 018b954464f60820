use tracing::{debug, trace};

use crate::frame::{DecodeMethod, FrameCollection, ReplicaRecord, ReplicaStatus};
use crate::link::{linear_to_db, LinkResults};
use crate::prelude::*;
use crate::telemetry::{Event, TelemetrySink};

/// Successive interference cancellation over a single frame.
///
/// Candidates are visited by ascending slot id, then arrival order within the slot. The
/// first candidate the link results accept is removed from the frame along with all of
/// its replicas, which removes their interference from every slot they occupied.
pub struct SicEngine<'a> {
    link_results: &'a dyn LinkResults,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a> SicEngine<'a> {
    #[must_use]
    pub fn new(link_results: &'a dyn LinkResults, telemetry: &'a dyn TelemetrySink) -> Self {
        Self {
            link_results,
            telemetry,
        }
    }

    pub(crate) fn link_results(&self) -> &'a dyn LinkResults {
        self.link_results
    }

    pub(crate) fn telemetry(&self) -> &'a dyn TelemetrySink {
        self.telemetry
    }

    /// Scan the frame for a single decodable candidate.
    ///
    /// Returns `true` after the first success, which is appended to `decoded`, so the
    /// caller can re-scan with the reduced interference. Returns `false` if nothing in
    /// the frame can be decoded.
    ///
    /// # Errors
    /// If a slot is empty, a decoded packet's replicas cannot be found where its replica
    /// plan says they are, or the link results cannot evaluate a candidate. The frame
    /// must be discarded in this case.
    pub fn decode_pass(
        &self,
        frame: &mut FrameCollection,
        decoded: &mut Vec<ReplicaRecord>,
    ) -> Result<bool> {
        for slot in frame.slot_ids() {
            let count = frame.occupied(slot)?.len();
            for index in 0..count {
                let sinr = frame.sinr(slot, index).ok_or(Error::EmptySlot(slot))?;
                let record = frame
                    .record_mut(slot, index)
                    .ok_or(Error::EmptySlot(slot))?;
                record.composite_sinr = Some(sinr);

                let sinr_db = linear_to_db(sinr);
                self.telemetry.record(Event::LinkSinr { sinr_db });
                let decision = self.link_results.evaluate(sinr, &record.link)?;
                trace!(packet = %record.key, slot, sinr_db, ?decision, "sic candidate");

                if decision.is_success() {
                    let mut record = frame.remove_packet(slot, index)?;
                    record.status = ReplicaStatus::Decoded(DecodeMethod::Sic);
                    debug!(packet = %record.key, slot, sinr_db, "decoded");
                    decoded.push(record);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Repeat [Self::decode_pass] until it makes no progress, returning the number of
    /// passes performed.
    ///
    /// Every successful pass removes at least one record, so there are at most as many
    /// passes as records in the frame, plus the final pass that finds nothing.
    ///
    /// # Errors
    /// See [Self::decode_pass].
    pub fn converge(
        &self,
        frame: &mut FrameCollection,
        decoded: &mut Vec<ReplicaRecord>,
    ) -> Result<usize> {
        let mut passes = 1;
        while self.decode_pass(frame, decoded)? {
            passes += 1;
        }
        Ok(passes)
    }
}
