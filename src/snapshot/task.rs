use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use humansize::{file_size_opts as options, FileSize};
use tokio::{
    select,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    camera::{Camera, CameraConfig},
    snapshot::SnapshotStore,
    task::Task,
};

/// Pulls a snapshot from the camera on a fixed interval and keeps the most
/// recent ones on disk.
pub struct SnapshotTask {
    camera: Box<dyn Camera>,
    store: SnapshotStore,
    interval: Duration,
}

pub async fn create_task(
    config: &CameraConfig,
    camera: Box<dyn Camera>,
) -> anyhow::Result<SnapshotTask> {
    if config.interval.is_zero() {
        anyhow::bail!("snapshot interval must be greater than zero");
    }

    let store = SnapshotStore::open(config.directory.clone(), config.max_keep)
        .await
        .context("failed to open snapshot directory")?;

    Ok(SnapshotTask {
        camera,
        store,
        interval: config.interval,
    })
}

impl SnapshotTask {
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Takes one snapshot and saves it.
    pub async fn capture(&mut self) -> anyhow::Result<PathBuf> {
        let image = self
            .camera
            .snapshot()
            .await
            .context("could not get snapshot from camera")?;

        let timestamp = chrono::Local::now().timestamp();
        let path = self
            .store
            .save(timestamp, &image)
            .await
            .context("could not save snapshot")?;

        info!(
            "saved {} ({})",
            path.display(),
            image
                .len()
                .file_size(options::CONVENTIONAL)
                .unwrap_or_default()
        );

        Ok(path)
    }
}

#[async_trait]
impl Task for SnapshotTask {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut task = *self;
        let mut ticker = interval(task.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let loop_fut = async move {
            loop {
                ticker.tick().await;

                // a failed capture is retried on the next tick
                if let Err(err) = task.capture().await {
                    error!("{:#}", err);
                }

                trace!("next snapshot in {:?}", task.interval);
            }

            #[allow(unreachable_code)]
            Ok::<_, anyhow::Error>(())
        };

        select! {
          _ = cancel.cancelled() => {}
          res = loop_fut => { res? }
        }

        Ok(())
    }
}
