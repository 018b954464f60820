//! Per-frame collection of received replicas.
//!
//! A [FrameCollection] maps each slot of a random access frame to the replicas that were
//! received in it, in arrival order. It is filled while the frame is being received and
//! is consumed by the decoder when the frame ends.
mod replica;

pub use replica::*;

use std::collections::{BTreeMap, HashSet};

use crate::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct FrameCollection {
    slot_count: u16,
    slots: BTreeMap<SlotId, Vec<ReplicaRecord>>,
}

impl FrameCollection {
    /// Create an empty frame with slots `0..slot_count`.
    #[must_use]
    pub fn new(slot_count: u16) -> Self {
        Self {
            slot_count,
            slots: BTreeMap::default(),
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> u16 {
        self.slot_count
    }

    /// Register a received replica in its home slot.
    ///
    /// # Errors
    /// - [Error::SlotOutOfRange] if the home slot or any sibling slot is not in the frame
    /// - [Error::InvalidReplicaPlan] if the sibling slots repeat or include the home slot
    /// - [Error::DuplicateReplica] if the slot already holds a replica of the packet
    /// - [Error::UnplannedReplica] if replicas of the packet already collected carry a
    ///   different replica plan
    pub fn insert(&mut self, record: ReplicaRecord) -> Result<()> {
        for slot in record.slots() {
            if slot >= self.slot_count {
                return Err(Error::SlotOutOfRange {
                    slot,
                    slot_count: self.slot_count,
                });
            }
        }
        if record.siblings.contains(&record.slot) {
            return Err(Error::InvalidReplicaPlan {
                packet: record.key,
                reason: format!("sibling slots include home slot {}", record.slot),
            });
        }
        let unique: HashSet<SlotId> = record.siblings.iter().copied().collect();
        if unique.len() != record.siblings.len() {
            return Err(Error::InvalidReplicaPlan {
                packet: record.key,
                reason: format!("repeated sibling slots {:?}", record.siblings),
            });
        }

        if self
            .slot(record.slot)
            .is_some_and(|records| records.iter().any(|r| r.key == record.key))
        {
            return Err(Error::DuplicateReplica {
                slot: record.slot,
                packet: record.key,
            });
        }
        if self
            .records()
            .any(|r| r.key == record.key && !r.has_plan_of(&record))
        {
            return Err(Error::UnplannedReplica {
                slot: record.slot,
                packet: record.key,
            });
        }

        self.slots.entry(record.slot).or_default().push(record);
        Ok(())
    }

    /// Records in `slot`, or `None` if nothing is (or is left) in the slot.
    #[must_use]
    pub fn slot(&self, slot: SlotId) -> Option<&[ReplicaRecord]> {
        self.slots.get(&slot).map(Vec::as_slice)
    }

    #[must_use]
    pub fn slot_len(&self, slot: SlotId) -> usize {
        self.slots.get(&slot).map_or(0, Vec::len)
    }

    /// Ids of occupied slots in ascending order.
    #[must_use]
    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.slots.keys().copied().collect()
    }

    #[must_use]
    pub fn occupied_slots(&self) -> usize {
        self.slots.len()
    }

    /// Total number of replica records in the frame.
    #[must_use]
    pub fn replica_count(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Number of distinct logical packets in the frame.
    #[must_use]
    pub fn packet_count(&self) -> usize {
        self.records()
            .map(|r| r.key)
            .collect::<HashSet<PacketKey>>()
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All records, by slot then arrival order.
    pub fn records(&self) -> impl Iterator<Item = &ReplicaRecord> {
        self.slots.values().flatten()
    }

    /// Records of a slot being iterated by the decoder.
    ///
    /// # Errors
    /// [Error::EmptySlot] if the slot is present but holds nothing.
    pub(crate) fn occupied(&self, slot: SlotId) -> Result<&[ReplicaRecord]> {
        match self.slots.get(&slot) {
            Some(records) if !records.is_empty() => Ok(records),
            _ => Err(Error::EmptySlot(slot)),
        }
    }

    pub(crate) fn record_mut(&mut self, slot: SlotId, index: usize) -> Option<&mut ReplicaRecord> {
        self.slots.get_mut(&slot)?.get_mut(index)
    }

    /// SINR of the record at `index` in `slot`, given the interference of every other
    /// record currently in the slot.
    #[must_use]
    pub fn sinr(&self, slot: SlotId, index: usize) -> Option<f64> {
        let records = self.slots.get(&slot)?;
        let record = records.get(index)?;
        let interference: f64 = records
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, r)| r.signal.rx_power_w)
            .sum();
        Some(record.signal.sinr(interference))
    }

    /// Locate the replica of `record` in `slot`.
    ///
    /// # Errors
    /// - [Error::MissingSlot] if the slot is not in the frame
    /// - [Error::MissingReplica] if the slot holds no replica of the packet
    /// - [Error::DuplicateReplica] if the slot holds more than one
    pub fn replica_index(&self, slot: SlotId, record: &ReplicaRecord) -> Result<usize> {
        let records = self.slots.get(&slot).ok_or(Error::MissingSlot {
            slot,
            packet: record.key,
        })?;

        let mut found = None;
        for (idx, candidate) in records.iter().enumerate() {
            if candidate.is_replica_of(record) {
                if found.is_some() {
                    return Err(Error::DuplicateReplica {
                        slot,
                        packet: record.key,
                    });
                }
                found = Some(idx);
            }
        }
        found.ok_or(Error::MissingReplica {
            slot,
            packet: record.key,
        })
    }

    /// Remove the record at `index` in `slot` along with every sibling replica, returning
    /// the removed record.
    ///
    /// All sibling replicas are located before anything is removed. Slots left empty are
    /// dropped from the frame.
    ///
    /// # Errors
    /// Any error from [Self::replica_index] for a sibling slot, or
    /// [Error::UnplannedReplica] if the packet also has a replica in a slot outside of
    /// the record's plan. The frame is unchanged when an error is returned.
    pub fn remove_packet(&mut self, slot: SlotId, index: usize) -> Result<ReplicaRecord> {
        let record = self
            .slots
            .get(&slot)
            .and_then(|records| records.get(index))
            .ok_or(Error::EmptySlot(slot))?;

        let mut located = Vec::with_capacity(record.siblings.len());
        for sibling in &record.siblings {
            located.push((*sibling, self.replica_index(*sibling, record)?));
        }
        self.check_unplanned(record)?;

        let removed = self.take(slot, index);
        for (sibling, idx) in located {
            self.take(sibling, idx);
        }
        Ok(removed)
    }

    // Caller guarantees slot and index exist
    fn take(&mut self, slot: SlotId, index: usize) -> ReplicaRecord {
        let records = self.slots.entry(slot).or_default();
        let record = records.remove(index);
        if records.is_empty() {
            self.slots.remove(&slot);
        }
        record
    }

    /// One record for every packet still in the frame, taken from the lowest slot the
    /// packet occupies.
    #[must_use]
    pub fn unresolved(&self) -> Vec<ReplicaRecord> {
        let mut seen = HashSet::new();
        self.records()
            .filter(|r| seen.insert(r.key))
            .cloned()
            .collect()
    }

    // Packet replicas in slots the record's plan does not include
    fn check_unplanned(&self, record: &ReplicaRecord) -> Result<()> {
        let stray = self.slots.iter().find(|(slot, records)| {
            !record.plans_slot(**slot) && records.iter().any(|r| r.key == record.key)
        });
        match stray {
            Some((slot, _)) => Err(Error::UnplannedReplica {
                slot: *slot,
                packet: record.key,
            }),
            None => Ok(()),
        }
    }

    /// Check that every record's sibling slots hold exactly one replica of its packet and
    /// that no packet has replicas outside of its plan.
    ///
    /// # Errors
    /// The first inconsistency found, see [Self::replica_index].
    pub fn verify(&self) -> Result<()> {
        for (slot, records) in &self.slots {
            if records.is_empty() {
                return Err(Error::EmptySlot(*slot));
            }
            for record in records {
                for sibling in &record.siblings {
                    self.replica_index(*sibling, record)?;
                }
                self.check_unplanned(record)?;
            }
        }
        Ok(())
    }
}
