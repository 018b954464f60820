//! Random access frame decoding.
//!
//! A [Decoder] takes a complete [FrameCollection] and resolves as many packets as it can
//! according to its [DecodePolicy]:
//!
//! - [DecodePolicy::Sic] runs successive interference cancellation (CRDSA) until no
//!   further packet can be decoded.
//! - [DecodePolicy::Marsala] additionally tries to decode the remaining packets by
//!   correlating all of their replicas, re-running SIC after every success.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use crdsa::decoder::{DecodePolicy, Decoder};
//! use crdsa::frame::{FrameCollection, PacketKey, ReplicaRecord, SignalQuality};
//! use crdsa::link::SinrThreshold;
//!
//! let decoder = Decoder::builder()
//!     .policy(DecodePolicy::Marsala)
//!     .link_results(Arc::new(SinrThreshold::new(3.0)))
//!     .build();
//!
//! let mut frame = FrameCollection::new(16);
//! let key = PacketKey::new(42, 0);
//! frame.insert(ReplicaRecord::new(key, 3, vec![9], SignalQuality::new(10.0, 1.0))).unwrap();
//! frame.insert(ReplicaRecord::new(key, 9, vec![3], SignalQuality::new(10.0, 1.0))).unwrap();
//!
//! let zult = decoder.decode(frame).unwrap();
//! assert_eq!(zult.decoded.len(), 1);
//! assert_eq!(zult.decoded[0].key, key);
//! ```
mod marsala;
mod sic;

pub use marsala::*;
pub use sic::*;

use std::{fmt::Display, sync::Arc};

use rayon::prelude::*;
use tracing::{debug, span, Level};
use typed_builder::TypedBuilder;

use crate::frame::{DecodeMethod, FrameCollection, ReplicaRecord, ReplicaStatus};
use crate::link::LinkResults;
use crate::prelude::*;
use crate::telemetry::{NullSink, TelemetrySink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DecodePolicy {
    /// Successive interference cancellation only.
    #[default]
    Sic,
    /// Successive interference cancellation followed by replica correlation.
    Marsala,
}

/// Processing state of a random access frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameState {
    /// Replicas are being received.
    Collecting,
    Decoding,
    Correlating,
    /// Decoding is complete and the frame contents have been released.
    Finalized,
}

impl Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrameState::Collecting => "COLLECTING",
            FrameState::Decoding => "DECODING",
            FrameState::Correlating => "CORRELATING",
            FrameState::Finalized => "FINALIZED",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSummary {
    /// Replica records in the frame before decoding.
    pub replicas: usize,
    /// Distinct packets in the frame before decoding.
    pub packets: usize,
    pub decoded_sic: usize,
    pub decoded_correlation: usize,
    pub unresolved: usize,
    /// SIC passes performed, including each final pass that found nothing.
    pub sic_passes: usize,
    pub correlation_passes: usize,
}

/// Result of decoding a frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedFrame {
    /// Decoded packets, in decode order. Each is the replica it was decoded from.
    pub decoded: Vec<ReplicaRecord>,
    /// One replica of every packet that could not be decoded.
    pub unresolved: Vec<ReplicaRecord>,
    pub summary: FrameSummary,
}

/// Frame decoder combining a [DecodePolicy], link results and a telemetry sink.
///
/// The decoder holds no per-frame state, so one decoder can decode any number of frames,
/// including concurrently, see [Decoder::decode_all].
#[derive(TypedBuilder)]
pub struct Decoder {
    #[builder(default)]
    policy: DecodePolicy,
    link_results: Arc<dyn LinkResults>,
    #[builder(default = Arc::new(NullSink) as Arc<dyn TelemetrySink>)]
    telemetry: Arc<dyn TelemetrySink>,
}

impl Decoder {
    #[must_use]
    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Decode a complete frame.
    ///
    /// # Errors
    /// If the frame violates replica consistency, i.e., a decoded packet's replicas are
    /// not where its replica plan says they are, or the link results fail. Nothing of the
    /// frame is returned in this case.
    pub fn decode(&self, mut frame: FrameCollection) -> Result<DecodedFrame> {
        let span = span!(
            Level::DEBUG,
            "frame",
            policy = ?self.policy,
            slots = frame.slot_count()
        );
        let _guard = span.enter();

        let mut summary = FrameSummary {
            replicas: frame.replica_count(),
            packets: frame.packet_count(),
            ..Default::default()
        };
        let mut decoded = Vec::with_capacity(summary.packets);

        let sic = SicEngine::new(self.link_results.as_ref(), self.telemetry.as_ref());
        match self.policy {
            DecodePolicy::Sic => {
                debug!(state = %FrameState::Decoding, "running sic");
                summary.sic_passes = sic.converge(&mut frame, &mut decoded)?;
            }
            DecodePolicy::Marsala => {
                let passes = Correlator::new(sic).run(&mut frame, &mut decoded)?;
                summary.sic_passes = passes.sic;
                summary.correlation_passes = passes.correlation;
            }
        }

        for record in &decoded {
            match record.status {
                ReplicaStatus::Decoded(DecodeMethod::Sic) => summary.decoded_sic += 1,
                ReplicaStatus::Decoded(DecodeMethod::Correlation) => {
                    summary.decoded_correlation += 1;
                }
                ReplicaStatus::Pending => {}
            }
        }
        let unresolved = frame.unresolved();
        summary.unresolved = unresolved.len();

        debug!(
            state = %FrameState::Finalized,
            decoded = decoded.len(),
            unresolved = summary.unresolved,
            "frame decoded"
        );

        Ok(DecodedFrame {
            decoded,
            unresolved,
            summary,
        })
    }

    /// Decode independent frames, e.g., from different carriers, in parallel.
    ///
    /// Results are in the same order as `frames`. A failed frame does not affect the
    /// others.
    pub fn decode_all(&self, frames: Vec<FrameCollection>) -> Vec<Result<DecodedFrame>> {
        frames
            .into_par_iter()
            .map(|frame| self.decode(frame))
            .collect()
    }
}
