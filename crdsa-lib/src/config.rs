//! JSON decoder configuration.
//!
//! # Example
//! ```
//! use crdsa::config::DecoderConfig;
//! use crdsa::decoder::DecodePolicy;
//!
//! let config = DecoderConfig::from_json(r#"{
//!     "policy": "marsala",
//!     "link_results": {"type": "threshold", "threshold_db": 3.5}
//! }"#).unwrap();
//!
//! assert_eq!(config.policy, DecodePolicy::Marsala);
//! ```
use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::decoder::{DecodePolicy, Decoder};
use crate::link::{BlerCurve, BlerCurves, LinkResults, SinrThreshold, WaveformId};
use crate::prelude::*;
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformThreshold {
    pub waveform: WaveformId,
    pub threshold_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformCurve {
    pub waveform: WaveformId,
    /// `[ebno_db, bler]` pairs.
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkResultsConfig {
    Threshold {
        threshold_db: f64,
        #[serde(default)]
        waveforms: Vec<WaveformThreshold>,
    },
    BlerCurves {
        bler_target: f64,
        curves: Vec<WaveformCurve>,
    },
}

impl LinkResultsConfig {
    /// Construct the configured link results.
    ///
    /// # Errors
    /// [Error::LinkResults] if a BLER curve or target is invalid.
    pub fn build(&self) -> Result<Arc<dyn LinkResults>> {
        match self {
            LinkResultsConfig::Threshold {
                threshold_db,
                waveforms,
            } => {
                let oracle = waveforms
                    .iter()
                    .fold(SinrThreshold::new(*threshold_db), |oracle, wf| {
                        oracle.with_waveform(wf.waveform, wf.threshold_db)
                    });
                Ok(Arc::new(oracle))
            }
            LinkResultsConfig::BlerCurves {
                bler_target,
                curves,
            } => {
                let mut oracle = BlerCurves::new(*bler_target)?;
                for curve in curves {
                    let points = BlerCurve::new(curve.points.clone())?;
                    oracle = oracle.with_curve(curve.waveform, points);
                }
                Ok(Arc::new(oracle))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub policy: DecodePolicy,
    pub link_results: LinkResultsConfig,
}

impl DecoderConfig {
    /// # Errors
    /// If the file cannot be read or is not a valid configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// # Errors
    /// If `json` is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Construct a [Decoder] reporting to `telemetry`.
    ///
    /// # Errors
    /// See [LinkResultsConfig::build].
    pub fn decoder(&self, telemetry: Arc<dyn TelemetrySink>) -> Result<Decoder> {
        Ok(Decoder::builder()
            .policy(self.policy)
            .link_results(self.link_results.build()?)
            .telemetry(telemetry)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::link::{db_to_linear, Decision, LinkParams};
    use crate::telemetry::NullSink;

    const BLER_CONFIG: &str = r#"{
        "link_results": {
            "type": "bler_curves",
            "bler_target": 0.01,
            "curves": [
                {"waveform": 3, "points": [[0.0, 1.0], [2.0, 0.1], [4.0, 0.001]]}
            ]
        }
    }"#;

    #[test]
    fn defaults_to_sic() {
        let config = DecoderConfig::from_json(BLER_CONFIG).unwrap();
        assert_eq!(config.policy, DecodePolicy::Sic);
        let decoder = config.decoder(Arc::new(NullSink)).unwrap();
        assert_eq!(decoder.policy(), DecodePolicy::Sic);
    }

    #[test]
    fn bler_curves() {
        let config = DecoderConfig::from_json(BLER_CONFIG).unwrap();
        let oracle = config.link_results.build().unwrap();
        let params = LinkParams::new(3, 1.0);

        // target of 0.01 is reached at ~3.82dB
        assert_eq!(
            oracle.evaluate(db_to_linear(3.9), &params).unwrap(),
            Decision::Success
        );
        assert_eq!(
            oracle.evaluate(db_to_linear(3.7), &params).unwrap(),
            Decision::Failure
        );
    }

    #[test]
    fn threshold_with_waveforms() {
        let config = DecoderConfig::from_json(
            r#"{
            "policy": "marsala",
            "link_results": {
                "type": "threshold",
                "threshold_db": 3.0,
                "waveforms": [{"waveform": 2, "threshold_db": 6.0}]
            }
        }"#,
        )
        .unwrap();
        assert_eq!(config.policy, DecodePolicy::Marsala);

        let oracle = config.link_results.build().unwrap();
        let sinr = db_to_linear(4.0);
        assert!(oracle
            .evaluate(sinr, &LinkParams::new(1, 1.0))
            .unwrap()
            .is_success());
        assert!(!oracle
            .evaluate(sinr, &LinkParams::new(2, 1.0))
            .unwrap()
            .is_success());
    }

    #[test]
    fn invalid_bler_target() {
        let config = DecoderConfig::from_json(
            r#"{"link_results": {"type": "bler_curves", "bler_target": 2.0, "curves": []}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.decoder(Arc::new(NullSink)),
            Err(Error::LinkResults(_))
        ));
    }

    #[test]
    fn from_file() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("decoder.json");
        fs::write(&path, BLER_CONFIG).unwrap();

        let config = DecoderConfig::from_file(&path).unwrap();
        assert_eq!(config, DecoderConfig::from_json(BLER_CONFIG).unwrap());

        let zult = DecoderConfig::from_file(tmpdir.path().join("missing.json"));
        assert!(matches!(zult, Err(Error::Io(_))));
    }

    #[test]
    fn invalid_json() {
        let zult = DecoderConfig::from_json(r#"{"link_results": {"type": "magic"}}"#);
        assert!(matches!(zult, Err(Error::Json(_))));
    }
}
