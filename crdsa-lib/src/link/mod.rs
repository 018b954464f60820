//! Link-performance oracles.
//!
//! An oracle decides whether a burst received with a given SINR would be decoded by the
//! demodulator, given the waveform it was sent with. The decoder never looks at samples,
//! only at these decisions.
mod bler;
mod threshold;

pub use bler::*;
pub use threshold::*;

use crate::prelude::*;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::From, derive_more::Display,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WaveformId(pub u32);

/// Link and modulation parameters of a burst as supplied by the PHY.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkParams {
    pub waveform: WaveformId,
    /// Information bits per modulated symbol, i.e., bits per symbol times the code rate.
    pub spectral_efficiency: f64,
}

impl LinkParams {
    #[must_use]
    pub fn new(waveform: u32, spectral_efficiency: f64) -> Self {
        Self {
            waveform: WaveformId(waveform),
            spectral_efficiency,
        }
    }

    /// Convert a linear Es/N0 into Eb/N0 in dB for this waveform.
    #[must_use]
    pub fn ebno_db(&self, sinr: f64) -> f64 {
        linear_to_db(sinr / self.spectral_efficiency)
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self::new(0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    Success,
    Failure,
}

impl Decision {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Decision::Success
    }
}

impl From<bool> for Decision {
    fn from(ok: bool) -> Self {
        if ok {
            Decision::Success
        } else {
            Decision::Failure
        }
    }
}

pub trait LinkResults: Send + Sync {
    /// Decide whether a burst with the linear `sinr` is received without error.
    ///
    /// # Errors
    /// If the oracle cannot evaluate `params`, e.g., no results for its waveform.
    fn evaluate(&self, sinr: f64, params: &LinkParams) -> Result<Decision>;
}

impl<F> LinkResults for F
where
    F: Fn(f64, &LinkParams) -> Decision + Send + Sync,
{
    fn evaluate(&self, sinr: f64, params: &LinkParams) -> Result<Decision> {
        Ok(self(sinr, params))
    }
}

#[must_use]
pub fn linear_to_db(value: f64) -> f64 {
    10.0 * value.log10()
}

#[must_use]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversions() {
        assert!((linear_to_db(100.0) - 20.0).abs() < 1e-12);
        assert!((db_to_linear(3.0) - 1.995_262_314_968_88).abs() < 1e-9);
        assert!(linear_to_db(0.0).is_infinite());
    }

    #[test]
    fn ebno_accounts_for_spectral_efficiency() {
        let params = LinkParams::new(3, 2.0);
        // Es/N0 of 20 over 2 bits per symbol is an Eb/N0 of 10 (10 dB)
        assert!((params.ebno_db(20.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn closure_oracle() {
        let oracle = |sinr: f64, _: &LinkParams| Decision::from(sinr > 1.0);
        let params = LinkParams::default();
        assert_eq!(oracle.evaluate(2.0, &params).unwrap(), Decision::Success);
        assert_eq!(oracle.evaluate(0.5, &params).unwrap(), Decision::Failure);
    }
}
