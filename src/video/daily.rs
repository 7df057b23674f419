use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::{DateTime, Local};

use crate::notify::{Notifier, VideoNotice};

use super::{
    prune_videos, run_window, select_frames, video_file_name, Encoder, TimeOfDay, VideoConfig,
};

/// Builds the video of the previous night from the snapshots on disk and
/// announces it.
pub struct DailyVideo {
    frames_dir: PathBuf,
    output_path: PathBuf,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    run_delay: Duration,
    max_videos: Option<usize>,
    encoder: Encoder,
    public_url: Option<String>,
    notifier: Option<Box<dyn Notifier>>,
}

impl DailyVideo {
    pub fn new(
        config: &VideoConfig,
        frames_dir: PathBuf,
        public_url: Option<String>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        DailyVideo {
            frames_dir,
            output_path: config.output_path.clone(),
            start_time: config.start_time,
            end_time: config.end_time,
            run_delay: config.run_delay,
            // the video just built is never pruned
            max_videos: config.max_videos.map(|max| max.max(1)),
            encoder: Encoder::new(config.encoder.clone(), config.framerate),
            public_url,
            notifier,
        }
    }

    pub fn link(&self, name: &str) -> String {
        match &self.public_url {
            Some(base) => format!("{}/videos/{}", base.trim_end_matches('/'), name),
            None => name.to_owned(),
        }
    }

    /// Makes the video for the window that ended `run_delay` before `now`.
    /// Returns `None` when no snapshots fall in the window.
    pub async fn run_once(&self, now: DateTime<Local>) -> anyhow::Result<Option<VideoNotice>> {
        let window = run_window(&now, self.start_time, self.end_time, self.run_delay)
            .context("could not compute capture window")?;

        let frames = select_frames(&self.frames_dir, window)?;

        if frames.is_empty() {
            warn!(
                "no snapshots between {} yesterday and {} today, skipping video",
                self.start_time, self.end_time
            );
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.output_path)
            .await
            .with_context(|| format!("could not create {}", self.output_path.display()))?;

        let name = video_file_name(&now);
        let output = self.output_path.join(&name);

        info!("encoding {} frames into {}", frames.len(), output.display());

        let video = self
            .encoder
            .encode(&frames, &output)
            .await
            .context("failed to encode video")?;

        if let Err(err) = prune_videos(&self.output_path, self.max_videos).await {
            warn!("could not prune old videos: {:#}", err);
        }

        let notice = VideoNotice {
            link: self.link(&name),
            path: video.path,
            created: now,
            frames: video.frames,
        };

        info!("video ready at {}", notice.link);

        if let Some(notifier) = &self.notifier {
            notifier
                .notify(&notice)
                .await
                .context("failed to send video notification")?;
        }

        Ok(Some(notice))
    }
}
