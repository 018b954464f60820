use std::collections::HashMap;

use tracing::trace;

use super::{Decision, LinkParams, LinkResults, WaveformId};
use crate::prelude::*;

/// Block error rate as a function of Eb/N0 for a single waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct BlerCurve {
    /// `(ebno_db, bler)` points ordered by increasing Eb/N0.
    points: Vec<(f64, f64)>,
}

impl BlerCurve {
    /// Construct from `(ebno_db, bler)` points, in any order.
    ///
    /// # Errors
    /// [Error::LinkResults] if there are no points, any value is not finite, or a BLER is
    /// outside of `[0, 1]`.
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::LinkResults("BLER curve has no points".to_string()));
        }
        for (ebno, bler) in &points {
            if !ebno.is_finite() || !bler.is_finite() {
                return Err(Error::LinkResults(format!(
                    "BLER curve point ({ebno}, {bler}) is not finite"
                )));
            }
            if !(0.0..=1.0).contains(bler) {
                return Err(Error::LinkResults(format!(
                    "BLER {bler} at {ebno}dB is not a probability"
                )));
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Eb/N0 in dB required to reach a BLER of `target`, or `None` if the curve never gets
    /// that low.
    ///
    /// Values between curve points are linearly interpolated.
    #[must_use]
    pub fn required_ebno_db(&self, target: f64) -> Option<f64> {
        let (first_ebno, first_bler) = self.points[0];
        if first_bler <= target {
            return Some(first_ebno);
        }
        for pair in self.points.windows(2) {
            let (lo_ebno, lo_bler) = pair[0];
            let (hi_ebno, hi_bler) = pair[1];
            if lo_bler > target && hi_bler <= target {
                let frac = (lo_bler - target) / (lo_bler - hi_bler);
                return Some(lo_ebno + frac * (hi_ebno - lo_ebno));
            }
        }
        None
    }
}

/// Link results given as per-waveform BLER curves and a target BLER.
///
/// A burst is received when its Eb/N0 reaches the Eb/N0 at which its waveform's curve
/// crosses the target BLER.
#[derive(Debug, Clone)]
pub struct BlerCurves {
    bler_target: f64,
    curves: HashMap<WaveformId, BlerCurve>,
}

impl BlerCurves {
    /// # Errors
    /// [Error::LinkResults] if `bler_target` is not in `(0, 1]`.
    pub fn new(bler_target: f64) -> Result<Self> {
        if !(bler_target > 0.0 && bler_target <= 1.0) {
            return Err(Error::LinkResults(format!(
                "BLER target {bler_target} must be in (0, 1]"
            )));
        }
        Ok(Self {
            bler_target,
            curves: HashMap::default(),
        })
    }

    #[must_use]
    pub fn with_curve(mut self, waveform: WaveformId, curve: BlerCurve) -> Self {
        self.curves.insert(waveform, curve);
        self
    }

    #[must_use]
    pub fn bler_target(&self) -> f64 {
        self.bler_target
    }

    #[must_use]
    pub fn curve(&self, waveform: WaveformId) -> Option<&BlerCurve> {
        self.curves.get(&waveform)
    }
}

impl LinkResults for BlerCurves {
    fn evaluate(&self, sinr: f64, params: &LinkParams) -> Result<Decision> {
        let curve = self
            .curves
            .get(&params.waveform)
            .ok_or(Error::UnknownWaveform(params.waveform))?;

        let Some(required) = curve.required_ebno_db(self.bler_target) else {
            trace!(waveform = %params.waveform, "target BLER not reachable");
            return Ok(Decision::Failure);
        };
        let ebno = params.ebno_db(sinr);
        trace!(waveform = %params.waveform, ebno, required, "checking against link results");

        Ok(Decision::from(ebno >= required))
    }
}
