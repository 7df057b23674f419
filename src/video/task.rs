use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::task::Task;

use super::{next_run, DailyVideo, TimeOfDay, VideoConfig};

/// Runs the daily video pipeline once a day, shortly after the end of the
/// capture window.
pub struct VideoTask {
    daily: DailyVideo,
    end_time: TimeOfDay,
    run_delay: Duration,
}

pub fn create_task(config: &VideoConfig, daily: DailyVideo) -> VideoTask {
    VideoTask {
        daily,
        end_time: config.end_time,
        run_delay: config.run_delay,
    }
}

#[async_trait]
impl Task for VideoTask {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self {
            daily,
            end_time,
            run_delay,
        } = *self;

        let loop_fut = async move {
            loop {
                let now = Local::now();
                let at = next_run(&now, end_time, run_delay)?;

                info!("next video at {}", at.format("%F %H:%M:%S"));

                let wait = (at - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                match daily.run_once(Local::now()).await {
                    Ok(Some(notice)) => debug!("made video {}", notice.path.display()),
                    Ok(None) => {}
                    // tried again at the next scheduled run
                    Err(err) => error!("daily video failed: {:#}", err),
                }
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
