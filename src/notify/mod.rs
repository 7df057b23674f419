mod config;
mod mailgun;

pub use config::*;
pub use mailgun::*;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// What a notification says about a freshly built video.
#[derive(Clone, Debug)]
pub struct VideoNotice {
    pub link: String,
    pub path: PathBuf,
    pub created: DateTime<Local>,
    pub frames: usize,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &VideoNotice) -> anyhow::Result<()>;
}
