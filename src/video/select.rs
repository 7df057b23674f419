use std::path::{Path, PathBuf};

use crate::snapshot::list_snapshots;

use super::TimeWindow;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub timestamp: i64,
    pub path: PathBuf,
}

/// Selects the snapshots in `directory` taken within `window`, oldest first.
pub fn select_frames(directory: &Path, window: TimeWindow) -> anyhow::Result<Vec<Frame>> {
    let frames: Vec<_> = list_snapshots(directory)?
        .into_iter()
        .filter(|(timestamp, _)| window.contains(*timestamp))
        .map(|(timestamp, path)| Frame { timestamp, path })
        .collect();

    debug!(
        "selected {} frames from {} in [{}, {})",
        frames.len(),
        directory.display(),
        window.start,
        window.end
    );

    Ok(frames)
}
