use tracing::{debug, span, warn, Level};

use crate::decoder::{DecodedFrame, Decoder, FrameState};
use crate::frame::{FrameCollection, ReplicaRecord};
use crate::prelude::*;

pub type CarrierId = u32;

/// A random access carrier receiving one frame at a time.
///
/// The external scheduler calls [Self::start_frame] at the start of each random access
/// frame interval, [Self::receive] for every replica received during it and
/// [Self::end_frame] when the interval ends, which decodes and releases the frame.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use crdsa::carrier::RandomAccessCarrier;
/// use crdsa::decoder::{Decoder, FrameState};
/// use crdsa::frame::{PacketKey, ReplicaRecord, SignalQuality};
/// use crdsa::link::SinrThreshold;
///
/// let decoder = Decoder::builder()
///     .link_results(Arc::new(SinrThreshold::new(3.0)))
///     .build();
/// let mut carrier = RandomAccessCarrier::new(0, 64, decoder);
///
/// carrier.start_frame(1).unwrap();
/// carrier
///     .receive(ReplicaRecord::new(PacketKey::new(1, 0), 5, vec![], SignalQuality::new(10.0, 1.0)))
///     .unwrap();
/// let decoded = carrier.end_frame().unwrap();
///
/// assert_eq!(decoded.decoded.len(), 1);
/// assert_eq!(carrier.state(), FrameState::Finalized);
/// ```
pub struct RandomAccessCarrier {
    id: CarrierId,
    slots_per_frame: u16,
    decoder: Decoder,
    current: Option<(u64, FrameCollection)>,
    last_frame: Option<u64>,
}

impl RandomAccessCarrier {
    #[must_use]
    pub fn new(id: CarrierId, slots_per_frame: u16, decoder: Decoder) -> Self {
        Self {
            id,
            slots_per_frame,
            decoder,
            current: None,
            last_frame: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> CarrierId {
        self.id
    }

    /// Number of the frame being collected, if any.
    #[must_use]
    pub fn current_frame(&self) -> Option<u64> {
        self.current.as_ref().map(|(number, _)| *number)
    }

    /// [FrameState::Collecting] while a frame is open, otherwise [FrameState::Finalized].
    #[must_use]
    pub fn state(&self) -> FrameState {
        if self.current.is_some() {
            FrameState::Collecting
        } else {
            FrameState::Finalized
        }
    }

    /// Open frame `number` for collecting replicas.
    ///
    /// # Errors
    /// [Error::FrameInProgress] if the previous frame has not been ended.
    pub fn start_frame(&mut self, number: u64) -> Result<()> {
        if let Some((current, _)) = &self.current {
            return Err(Error::FrameInProgress(*current));
        }
        if let Some(last) = self.last_frame {
            if number <= last {
                warn!(carrier = self.id, number, last, "frame number did not increase");
            }
        }
        debug!(carrier = self.id, number, state = %FrameState::Collecting, "frame started");
        self.current = Some((number, FrameCollection::new(self.slots_per_frame)));
        Ok(())
    }

    /// Register a replica received during the open frame.
    ///
    /// # Errors
    /// [Error::NoActiveFrame] if no frame is open, or any error of
    /// [FrameCollection::insert].
    pub fn receive(&mut self, record: ReplicaRecord) -> Result<()> {
        let Some((_, frame)) = self.current.as_mut() else {
            return Err(Error::NoActiveFrame);
        };
        frame.insert(record)
    }

    /// Close the open frame and decode it.
    ///
    /// The frame is released whether or not decoding succeeds.
    ///
    /// # Errors
    /// [Error::NoActiveFrame] if no frame is open, or any error of [Decoder::decode].
    pub fn end_frame(&mut self) -> Result<DecodedFrame> {
        let (number, frame) = self.current.take().ok_or(Error::NoActiveFrame)?;
        self.last_frame = Some(number);

        let span = span!(Level::DEBUG, "carrier", id = self.id, frame = number);
        let _guard = span.enter();
        self.decoder.decode(frame)
    }
}
