use std::{convert::Infallible, net::SocketAddr, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use warp::{http::StatusCode, Filter};

use crate::{task::Task, video::list_videos};

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: SocketAddr,

    /// The url at which this server is reachable from the outside, used to
    /// build links in emails
    pub public_url: String,
}

/// Serves the finished videos over http.
pub struct ServerTask {
    address: SocketAddr,
    video_dir: PathBuf,
}

pub fn create_task(config: &ServerConfig, video_dir: PathBuf) -> ServerTask {
    ServerTask {
        address: config.address,
        video_dir,
    }
}

pub fn routes(
    video_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path!("health").and(warp::get()).map(|| "ok");

    let list = warp::path!("api" / "videos")
        .and(warp::get())
        .and(warp::any().map({
            let video_dir = video_dir.clone();
            move || video_dir.clone()
        }))
        .and_then(list_handler);

    let files = warp::path("videos").and(warp::fs::dir(video_dir));

    health
        .or(list)
        .or(files)
        .with(warp::trace::request())
}

async fn list_handler(video_dir: PathBuf) -> Result<impl warp::Reply, Infallible> {
    debug!("hit video list endpoint");

    let reply = match list_videos(&video_dir).await {
        Ok(mut videos) => {
            videos.reverse();
            warp::reply::with_status(warp::reply::json(&videos), StatusCode::OK)
        }
        Err(err) => {
            warn!("could not list videos: {:#}", err);
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "error": format!("{:#}", err) })),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    Ok(reply)
}

#[async_trait]
impl Task for ServerTask {
    fn name(&self) -> &'static str {
        "server"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self { address, video_dir } = *self;

        info!("initializing server");

        let (address, server) = warp::serve(routes(video_dir))
            .try_bind_with_graceful_shutdown(address, async move { cancel.cancelled().await })
            .with_context(|| format!("could not bind server to {}", address))?;

        info!("listening at {}", address);

        server.await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, time::Duration, time::SystemTime};

    use super::*;

    fn video(dir: &std::path::Path, name: &str, contents: &[u8], age: Duration) {
        std::fs::write(dir.join(name), contents).unwrap();
        File::options()
            .write(true)
            .open(dir.join(name))
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[tokio::test]
    async fn health() {
        let dir = tempfile::tempdir().unwrap();

        let res = warp::test::request()
            .path("/health")
            .reply(&routes(dir.path().to_owned()))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "ok");
    }

    #[tokio::test]
    async fn serves_video_files() {
        let dir = tempfile::tempdir().unwrap();
        video(dir.path(), "abc.mp4", b"not really a video", Duration::ZERO);

        let filter = routes(dir.path().to_owned());

        let res = warp::test::request()
            .path("/videos/abc.mp4")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "not really a video");

        let res = warp::test::request()
            .path("/videos/missing.mp4")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        video(dir.path(), "old.mp4", b"1", Duration::from_secs(600));
        video(dir.path(), "new.mp4", b"22", Duration::from_secs(1));

        let res = warp::test::request()
            .path("/api/videos")
            .reply(&routes(dir.path().to_owned()))
            .await;

        assert_eq!(res.status(), 200);

        let listing: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        let listing = listing.as_array().unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0]["name"], "new.mp4");
        assert_eq!(listing[0]["size"], 2);
        assert_eq!(listing[1]["name"], "old.mp4");
        assert!(listing[0].get("path").is_none());
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let task = create_task(
            &ServerConfig {
                address: ([127, 0, 0, 1], 0).into(),
                public_url: "http://localhost".into(),
            },
            dir.path().to_owned(),
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
