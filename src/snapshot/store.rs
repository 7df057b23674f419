use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::retention;

const SNAPSHOT_PREFIX: &str = "snapshot-";
const SNAPSHOT_EXTENSION: &str = "jpg";

pub fn snapshot_file_name(timestamp: i64) -> String {
    format!("{}{}.{}", SNAPSHOT_PREFIX, timestamp, SNAPSHOT_EXTENSION)
}

/// Extracts the acquisition time embedded in a snapshot file name, e.g.
/// `snapshot-1514764800.jpg`.
pub fn snapshot_timestamp(path: &Path) -> Option<i64> {
    let is_jpg = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case(SNAPSHOT_EXTENSION));

    if !is_jpg {
        return None;
    }

    path.file_stem()?
        .to_str()?
        .strip_prefix(SNAPSHOT_PREFIX)?
        .parse()
        .ok()
}

/// Lists the snapshots in `directory`, ordered by embedded timestamp.
pub fn list_snapshots(directory: &Path) -> anyhow::Result<Vec<(i64, PathBuf)>> {
    let pattern = format!(
        "{}/{}*.{}",
        glob::Pattern::escape(&directory.to_string_lossy()),
        SNAPSHOT_PREFIX,
        SNAPSHOT_EXTENSION
    );

    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let mut snapshots = Vec::new();

    for entry in glob::glob_with(&pattern, options).context("invalid snapshot pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!("could not read snapshot entry: {}", err);
                continue;
            }
        };

        match snapshot_timestamp(&path) {
            Some(timestamp) => snapshots.push((timestamp, path)),
            None => trace!("ignoring {}, no timestamp in name", path.display()),
        }
    }

    snapshots.sort();

    Ok(snapshots)
}

/// The on-disk set of snapshots, bounded to `max_keep` files.
pub struct SnapshotStore {
    directory: PathBuf,
    max_keep: Option<usize>,
    snaps: VecDeque<PathBuf>,
}

impl SnapshotStore {
    /// Opens the snapshot directory, creating it if necessary, and prunes
    /// any snapshots above the limit left over from a previous run.
    pub async fn open(directory: PathBuf, max_keep: Option<usize>) -> anyhow::Result<Self> {
        if tokio::fs::metadata(&directory).await.is_err() {
            debug!("creating directory {}", directory.display());
        }

        tokio::fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("could not create {}", directory.display()))?;

        let snaps = list_snapshots(&directory)?
            .into_iter()
            .map(|(_, path)| path)
            .collect::<VecDeque<_>>();

        debug!(
            "found {} existing snapshots in {}",
            snaps.len(),
            directory.display()
        );

        let mut store = SnapshotStore {
            directory,
            max_keep,
            snaps,
        };

        store.prune().await;

        Ok(store)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.snaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snaps.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Path> {
        self.snaps.iter().map(PathBuf::as_path)
    }

    /// Writes an image as `snapshot-<timestamp>.jpg` and prunes the oldest
    /// snapshots above the limit.
    pub async fn save(&mut self, timestamp: i64, image: &[u8]) -> anyhow::Result<PathBuf> {
        let image_path = self.directory.join(snapshot_file_name(timestamp));
        let part_path = image_path.with_extension("jpg.part");

        debug!("writing image to file '{}'", image_path.display());

        let mut image_file = File::create(&part_path)
            .await
            .context("failed to create image file")?;

        let written = async {
            image_file.write_all(image).await?;
            image_file.flush().await
        }
        .await;

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(err).context("failed to save image");
        }

        drop(image_file);

        tokio::fs::rename(&part_path, &image_path)
            .await
            .context("failed to move image into place")?;

        // a second capture within the same second replaces the file, and a
        // clock stepping backwards must not break timestamp order
        if !self.snaps.contains(&image_path) {
            let at = self
                .snaps
                .iter()
                .rposition(|p| snapshot_timestamp(p).map_or(true, |ts| ts <= timestamp))
                .map_or(0, |i| i + 1);

            self.snaps.insert(at, image_path.clone());
        }

        self.prune().await;

        Ok(image_path)
    }

    async fn prune(&mut self) {
        for expired in retention::drain_excess(&mut self.snaps, self.max_keep) {
            if let Err(err) = retention::remove_expired(&expired).await {
                warn!("could not delete {}: {}", expired.display(), err);
            }
        }
    }
}
