use crate::frame::{PacketKey, SlotId};
use crate::link::WaveformId;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A sibling slot declared by a packet's replica plan is not present in the frame.
    #[error("slot {slot} not found in frame (replica of packet {packet})")]
    MissingSlot { slot: SlotId, packet: PacketKey },

    /// A sibling slot exists but holds no replica of the packet.
    #[error("slot {slot} does not contain a replica of packet {packet}")]
    MissingReplica { slot: SlotId, packet: PacketKey },

    #[error("slot {slot} contains more than one replica of packet {packet}")]
    DuplicateReplica { slot: SlotId, packet: PacketKey },

    /// A slot holds a replica of a packet where that packet's replica plans do not put
    /// one, or the replicas of a packet carry different plans.
    #[error("slot {slot} holds a replica of packet {packet} outside of its replica plan")]
    UnplannedReplica { slot: SlotId, packet: PacketKey },

    #[error("no packet in slot {0}")]
    EmptySlot(SlotId),

    #[error("slot {slot} is outside of the frame (slot count {slot_count})")]
    SlotOutOfRange { slot: SlotId, slot_count: u16 },

    /// The replica plan carried by a record is not self consistent.
    #[error("invalid replica plan for packet {packet}: {reason}")]
    InvalidReplicaPlan { packet: PacketKey, reason: String },

    #[error("no link results for waveform {0}")]
    UnknownWaveform(WaveformId),

    #[error("invalid link results: {0}")]
    LinkResults(String),

    #[error("no frame is being collected")]
    NoActiveFrame,

    #[error("frame {0} is still being collected")]
    FrameInProgress(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for faults that indicate a mismatch between the transmit-side replica plan
    /// and the receive-side slot contents of a frame.
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::MissingSlot { .. }
                | Error::MissingReplica { .. }
                | Error::DuplicateReplica { .. }
                | Error::UnplannedReplica { .. }
                | Error::EmptySlot(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
