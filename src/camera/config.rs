use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    /// Base url of the camera, including the port
    pub url: String,
    pub user_name: String,
    pub password: String,

    /// How often to take a snapshot, in milliseconds
    #[serde(default = "default_interval", with = "serde_millis")]
    pub interval: Duration,

    /// How long to wait for the camera to respond, in milliseconds
    #[serde(default = "default_timeout", with = "serde_millis")]
    pub timeout: Duration,

    /// The folder in which to save snapshots
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// The maximum number of snapshots to keep on disk
    pub max_keep: Option<usize>,
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}
