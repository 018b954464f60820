use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use crdsa::frame::{FrameCollection, ReplicaRecord};
use serde::{Deserialize, Serialize};

/// Recorded random access frames of a single carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub slot_count: u16,
    /// Replicas received in each frame, in arrival order.
    pub frames: Vec<Vec<ReplicaRecord>>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("opening scenario {path:?}"))?,
        );
        serde_json::from_reader(reader).with_context(|| format!("parsing scenario {path:?}"))
    }

    /// Collect the replicas of every frame, one result per frame.
    pub fn frames(&self) -> Vec<crdsa::Result<FrameCollection>> {
        self.frames
            .iter()
            .map(|records| {
                let mut frame = FrameCollection::new(self.slot_count);
                for record in records {
                    frame.insert(record.clone())?;
                }
                Ok(frame)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const SCENARIO: &str = r#"{
        "slot_count": 8,
        "frames": [
            [
                {"key": {"source": 1, "sequence": 0}, "slot": 1, "siblings": [5],
                 "signal": {"rx_power_w": 10.0, "noise_power_w": 1.0}},
                {"key": {"source": 1, "sequence": 0}, "slot": 5, "siblings": [1],
                 "signal": {"rx_power_w": 10.0, "noise_power_w": 1.0}}
            ],
            [
                {"key": {"source": 2, "sequence": 0}, "slot": 9,
                 "signal": {"rx_power_w": 10.0, "noise_power_w": 1.0}}
            ]
        ]
    }"#;

    #[test]
    fn load_and_collect() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("scenario.json");
        fs::write(&path, SCENARIO).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.frames.len(), 2);

        let frames = scenario.frames();
        let first = frames[0].as_ref().unwrap();
        assert_eq!(first.replica_count(), 2);
        assert_eq!(first.packet_count(), 1);
        assert!(matches!(
            frames[1],
            Err(crdsa::Error::SlotOutOfRange { slot: 9, .. })
        ));
    }

    #[test]
    fn load_missing_file() {
        let tmpdir = tempfile::tempdir().unwrap();
        assert!(Scenario::load(&tmpdir.path().join("nope.json")).is_err());
    }
}
