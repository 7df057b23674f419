use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::Context;
use serde::Serialize;

use crate::retention;

#[derive(Clone, Debug, Serialize)]
pub struct VideoEntry {
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
    #[serde(serialize_with = "serialize_system_time")]
    pub modified: SystemTime,
}

fn serialize_system_time<S>(this: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    let time: chrono::DateTime<chrono::Local> = (*this).into();
    serializer.collect_str(&time.to_rfc3339())
}

/// Lists the videos in `directory`, oldest first by modification time.
pub async fn list_videos(directory: &Path) -> anyhow::Result<Vec<VideoEntry>> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .with_context(|| format!("could not read {}", directory.display()))?;

    let mut videos = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let is_mp4 = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("mp4"));

        if !is_mp4 {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(err) => {
                warn!("could not stat {}: {}", path.display(), err);
                continue;
            }
        };

        videos.push(VideoEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        });
    }

    videos.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

    Ok(videos)
}

/// Deletes the oldest videos until at most `max_videos` remain. Returns the
/// deleted paths.
pub async fn prune_videos(
    directory: &Path,
    max_videos: Option<usize>,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut videos: VecDeque<_> = list_videos(directory).await?.into();
    let mut deleted = Vec::new();

    for expired in retention::drain_excess(&mut videos, max_videos) {
        match retention::remove_expired(&expired.path).await {
            Ok(()) => deleted.push(expired.path),
            Err(err) => warn!("could not delete {}: {}", expired.path.display(), err),
        }
    }

    if !deleted.is_empty() {
        info!("pruned {} old videos", deleted.len());
    }

    Ok(deleted)
}
