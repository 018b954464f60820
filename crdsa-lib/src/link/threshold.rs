use std::collections::HashMap;

use super::{linear_to_db, Decision, LinkParams, LinkResults, WaveformId};
use crate::prelude::*;

/// Hard SINR threshold oracle.
///
/// A burst is received if its SINR in dB is at least the threshold configured for its
/// waveform, or the default threshold if the waveform has no specific one.
#[derive(Debug, Clone, PartialEq)]
pub struct SinrThreshold {
    pub threshold_db: f64,
    pub waveforms: HashMap<WaveformId, f64>,
}

impl SinrThreshold {
    #[must_use]
    pub fn new(threshold_db: f64) -> Self {
        Self {
            threshold_db,
            waveforms: HashMap::default(),
        }
    }

    /// Use `threshold_db` for bursts sent with `waveform`.
    #[must_use]
    pub fn with_waveform(mut self, waveform: WaveformId, threshold_db: f64) -> Self {
        self.waveforms.insert(waveform, threshold_db);
        self
    }

    #[must_use]
    pub fn threshold_for(&self, waveform: WaveformId) -> f64 {
        self.waveforms
            .get(&waveform)
            .copied()
            .unwrap_or(self.threshold_db)
    }
}

impl LinkResults for SinrThreshold {
    fn evaluate(&self, sinr: f64, params: &LinkParams) -> Result<Decision> {
        Ok(Decision::from(
            linear_to_db(sinr) >= self.threshold_for(params.waveform),
        ))
    }
}
