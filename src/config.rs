use std::path::Path;

use config::{Config, ConfigError};
use serde::Deserialize;

use crate::{camera::CameraConfig, notify::MailConfig, server::ServerConfig, video::VideoConfig};

#[derive(Debug, Deserialize)]
pub struct TimelapseConfig {
    pub camera: CameraConfig,
    pub video: VideoConfig,
    pub server: Option<ServerConfig>,
    pub email: Option<MailConfig>,
}

impl TimelapseConfig {
    /// Reads the config file at `path`, then applies overrides from
    /// `TIMELAPSE_CAM_*` environment variables. Nested keys are separated by
    /// a double underscore, e.g. `TIMELAPSE_CAM_EMAIL__KEY`.
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut c = Config::new();

        c.merge(config::File::from(path.as_ref()))?;
        c.merge(config::Environment::with_prefix("TIMELAPSE_CAM").separator("__"))?;

        c.try_into()
    }
}
