mod config;
mod foscam;

pub use config::*;
pub use foscam::*;

use async_trait::async_trait;
use bytes::Bytes;

/// A source of still images.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Fetches a single JPEG from the camera.
    async fn snapshot(&self) -> anyhow::Result<Bytes>;
}
