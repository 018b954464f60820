use std::path::Path;

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::scenario::Scenario;

/// Number of frames in `scenario` that fail to collect or are not replica consistent.
fn inconsistent_frames(scenario: &Scenario) -> usize {
    let mut failed = 0;
    for (idx, frame) in scenario.frames().into_iter().enumerate() {
        match frame.and_then(|frame| frame.verify().map(|()| frame)) {
            Ok(frame) => info!(
                frame = idx,
                replicas = frame.replica_count(),
                packets = frame.packet_count(),
                "ok"
            ),
            Err(err) => {
                error!(frame = idx, "{err}");
                failed += 1;
            }
        }
    }
    failed
}

pub fn check(input: &Path) -> Result<()> {
    let scenario = Scenario::load(input)?;
    let failed = inconsistent_frames(&scenario);
    if failed > 0 {
        bail!("{failed} of {} frames are inconsistent", scenario.frames.len());
    }
    info!("all {} frames are consistent", scenario.frames.len());
    Ok(())
}
