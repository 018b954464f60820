//! Observational output of the decoder.
//!
//! The decoder reports every SINR it evaluates and every correlation attempt to a
//! [TelemetrySink] owned by the caller. Nothing reported here influences decoding.
use std::sync::Mutex;

use crossbeam::channel::Sender;
use tracing::trace;

use crate::frame::SourceId;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// SINR of a candidate evaluated against the link results.
    LinkSinr { sinr_db: f64 },
    /// Outcome of a correlation attempt.
    ///
    /// `trials` is a diagnostic count derived from the frame occupancy and the packet's
    /// replica count. It carries no decoding semantics.
    Correlation {
        trials: u64,
        source: SourceId,
        success: bool,
    },
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: Event);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _event: Event) {}
}

/// Forwards events to `tracing` at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: Event) {
        match event {
            Event::LinkSinr { sinr_db } => trace!(sinr_db, "link sinr"),
            Event::Correlation {
                trials,
                source,
                success,
            } => trace!(trials, source, success, "marsala correlation"),
        }
    }
}

/// Sends events on a channel, e.g., to be aggregated by another thread.
///
/// Events are dropped if the receiving side has hung up.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl TelemetrySink for ChannelSink {
    fn record(&self, event: Event) {
        if self.tx.send(event).is_err() {
            trace!("telemetry receiver disconnected; dropping event");
        }
    }
}

/// Keeps all events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    /// Take all events recorded so far.
    pub fn take(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: Event) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Totals over a stream of [Event]s.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySummary {
    pub sinr_evaluations: usize,
    /// Mean of all finite SINRs, in dB.
    pub mean_sinr_db: Option<f64>,
    pub correlation_attempts: usize,
    pub correlation_successes: usize,

    #[cfg_attr(feature = "serde", serde(skip))]
    finite_sinrs: usize,
}

impl TelemetrySummary {
    pub fn add(&mut self, event: &Event) {
        match event {
            Event::LinkSinr { sinr_db } => {
                self.sinr_evaluations += 1;
                if sinr_db.is_finite() {
                    self.finite_sinrs += 1;
                    let mean = self.mean_sinr_db.unwrap_or(0.0);
                    self.mean_sinr_db = Some(mean + (sinr_db - mean) / self.finite_sinrs as f64);
                }
            }
            Event::Correlation { success, .. } => {
                self.correlation_attempts += 1;
                if *success {
                    self.correlation_successes += 1;
                }
            }
        }
    }
}

impl<'a> FromIterator<&'a Event> for TelemetrySummary {
    fn from_iter<T: IntoIterator<Item = &'a Event>>(iter: T) -> Self {
        let mut summary = Self::default();
        for event in iter {
            summary.add(event);
        }
        summary
    }
}
