use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use super::{LabelConfig, TimeOfDay};

#[derive(Clone, Debug, Deserialize)]
pub struct VideoConfig {
    /// The folder in which to save finished videos
    pub output_path: PathBuf,

    /// Snapshots shown per second of video
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// Snapshots taken after this time yesterday are included
    pub start_time: TimeOfDay,

    /// Snapshots taken before this time today are included
    pub end_time: TimeOfDay,

    /// How long after `end_time` to build the video, in milliseconds
    #[serde(default = "default_run_delay", with = "serde_millis")]
    pub run_delay: Duration,

    /// The maximum number of videos to keep on disk
    pub max_videos: Option<usize>,

    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub binary: PathBuf,
    pub codec: String,
    pub output_rate: u32,
    pub pixel_format: String,

    /// Capture time drawn onto each frame
    pub label: LabelConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            binary: PathBuf::from("ffmpeg"),
            codec: "libx264".into(),
            output_rate: 30,
            pixel_format: "yuv420p".into(),
            label: LabelConfig::default(),
        }
    }
}

fn default_framerate() -> u32 {
    10
}

fn default_run_delay() -> Duration {
    Duration::from_secs(5 * 60)
}
