use crate::link::LinkParams;

pub type SlotId = u16;
pub type SourceId = u64;

/// Identifies a logical packet. All replicas of a packet share the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[display("{source}/{sequence}")]
pub struct PacketKey {
    pub source: SourceId,
    /// Per-source sequence number of the packet.
    pub sequence: u32,
}

impl PacketKey {
    #[must_use]
    pub fn new(source: SourceId, sequence: u32) -> Self {
        Self { source, sequence }
    }
}

/// Power contributors of a single received replica.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalQuality {
    /// Received power of the replica, W.
    pub rx_power_w: f64,
    /// Thermal noise power over the carrier bandwidth, W.
    pub noise_power_w: f64,
    /// Interference from outside of this carrier, e.g., adjacent beams, W.
    #[cfg_attr(feature = "serde", serde(default))]
    pub external_interference_w: f64,
    /// Linear SINR of the feeder (second) hop when the return link is relayed by a
    /// transparent satellite.
    #[cfg_attr(feature = "serde", serde(default))]
    pub feeder_sinr: Option<f64>,
}

impl SignalQuality {
    #[must_use]
    pub fn new(rx_power_w: f64, noise_power_w: f64) -> Self {
        Self {
            rx_power_w,
            noise_power_w,
            external_interference_w: 0.0,
            feeder_sinr: None,
        }
    }

    /// SINR given `interference_w` of in-slot interference from colliding replicas.
    ///
    /// With a feeder hop the result is the composite of both hops,
    /// `1 / (1/uplink + 1/feeder)`.
    #[must_use]
    pub fn sinr(&self, interference_w: f64) -> f64 {
        let uplink = self.rx_power_w
            / (self.noise_power_w + self.external_interference_w + interference_w);
        match self.feeder_sinr {
            Some(feeder) => 1.0 / (1.0 / uplink + 1.0 / feeder),
            None => uplink,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeMethod {
    /// Decoded from a single replica after interference cancellation.
    #[default]
    Sic,
    /// Decoded by combining all of the packet's replicas.
    Correlation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplicaStatus {
    #[default]
    Pending,
    Decoded(DecodeMethod),
}

/// One received replica of a logical packet.
///
/// Each replica of a packet is its own record with its own home slot; the sibling slots
/// are the home slots of the packet's other replicas, as planned by the transmitter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplicaRecord {
    pub key: PacketKey,
    pub slot: SlotId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub siblings: Vec<SlotId>,
    pub signal: SignalQuality,
    #[cfg_attr(feature = "serde", serde(default))]
    pub link: LinkParams,
    /// Last SINR this replica was evaluated with.
    #[cfg_attr(feature = "serde", serde(default))]
    pub composite_sinr: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ReplicaStatus,
}

impl ReplicaRecord {
    #[must_use]
    pub fn new(key: PacketKey, slot: SlotId, siblings: Vec<SlotId>, signal: SignalQuality) -> Self {
        Self {
            key,
            slot,
            siblings,
            signal,
            link: LinkParams::default(),
            composite_sinr: None,
            status: ReplicaStatus::Pending,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: LinkParams) -> Self {
        self.link = link;
        self
    }

    #[must_use]
    pub fn source(&self) -> SourceId {
        self.key.source
    }

    /// Total number of replicas of this record's packet.
    #[must_use]
    pub fn replica_count(&self) -> usize {
        1 + self.siblings.len()
    }

    /// Home slot followed by the sibling slots.
    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        std::iter::once(self.slot).chain(self.siblings.iter().copied())
    }

    /// True if `other` is another replica of the same packet according to both replica
    /// plans.
    #[must_use]
    pub fn is_replica_of(&self, other: &ReplicaRecord) -> bool {
        self.key == other.key
            && self.siblings.contains(&other.slot)
            && other.siblings.contains(&self.slot)
    }

    /// True if the replica plan puts a replica of the packet in `slot`.
    #[must_use]
    pub fn plans_slot(&self, slot: SlotId) -> bool {
        self.slot == slot || self.siblings.contains(&slot)
    }

    /// True if both records place the packet's replicas in the same slots.
    #[must_use]
    pub fn has_plan_of(&self, other: &ReplicaRecord) -> bool {
        self.replica_count() == other.replica_count() && other.slots().all(|s| self.plans_slot(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinr_single_hop() {
        let signal = SignalQuality {
            rx_power_w: 10.0,
            noise_power_w: 1.0,
            external_interference_w: 1.0,
            feeder_sinr: None,
        };
        assert_eq!(signal.sinr(0.0), 5.0);
        assert_eq!(signal.sinr(3.0), 2.0);
    }

    #[test]
    fn sinr_composite_with_feeder() {
        let signal = SignalQuality {
            rx_power_w: 4.0,
            noise_power_w: 1.0,
            external_interference_w: 0.0,
            feeder_sinr: Some(4.0),
        };
        assert_eq!(signal.sinr(0.0), 2.0);
    }

    #[test]
    fn replica_plans() {
        let key = PacketKey::new(1, 0);
        let signal = SignalQuality::new(1.0, 1.0);
        let a = ReplicaRecord::new(key, 2, vec![5, 7], signal);
        let b = ReplicaRecord::new(key, 5, vec![2, 7], signal);
        let other_plan = ReplicaRecord::new(key, 5, vec![3, 7], signal);
        let other_packet = ReplicaRecord::new(PacketKey::new(1, 1), 5, vec![2, 7], signal);

        assert!(a.is_replica_of(&b));
        assert!(b.is_replica_of(&a));
        assert!(!a.is_replica_of(&other_plan));
        assert!(!a.is_replica_of(&other_packet));
        assert_eq!(a.replica_count(), 3);
        assert_eq!(a.slots().collect::<Vec<_>>(), vec![2, 5, 7]);

        assert!(a.has_plan_of(&b));
        assert!(!a.has_plan_of(&other_plan));
        assert!(a.plans_slot(7));
        assert!(!a.plans_slot(3));
        let fewer = ReplicaRecord::new(key, 5, vec![2], signal);
        assert!(!a.has_plan_of(&fewer));
        assert!(!fewer.has_plan_of(&a));
    }

    #[test]
    fn packet_key_display() {
        assert_eq!(PacketKey::new(12, 3).to_string(), "12/3");
    }
}
