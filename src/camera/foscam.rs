use std::str::FromStr;

use anyhow::{bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use super::{Camera, CameraConfig};

/// Client for the CGI interface exposed by Foscam network cameras.
pub struct FoscamCamera {
    endpoint: reqwest::Url,
    user_name: String,
    password: String,
    http: reqwest::Client,
}

impl FoscamCamera {
    pub fn new(config: &CameraConfig) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::from_str(&config.url).context("invalid camera url")?;
        let endpoint = base_url
            .join("/cgi-bin/CGIProxy.fcgi")
            .context("could not create snapshot url")?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to create http client")?;

        Ok(FoscamCamera {
            endpoint,
            user_name: config.user_name.clone(),
            password: config.password.clone(),
            http,
        })
    }
}

#[async_trait]
impl Camera for FoscamCamera {
    async fn snapshot(&self) -> anyhow::Result<Bytes> {
        trace!("requesting snapshot from {}", self.endpoint);

        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("cmd", "snapPicture2"),
                ("usr", self.user_name.as_str()),
                ("pwd", self.password.as_str()),
            ])
            .send()
            .await
            .context("could not connect to camera")?
            .error_for_status()
            .context("camera rejected snapshot request")?;

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        // the camera answers with a CGI_Result xml document when the
        // credentials are wrong or the sensor is busy
        if !content_type.starts_with("image/") {
            let body = res.text().await.unwrap_or_default();
            bail!(
                "camera returned {:?} instead of an image: {}",
                content_type,
                body.trim()
            );
        }

        let image = res.bytes().await.context("failed to read snapshot body")?;

        if image.is_empty() {
            bail!("camera returned an empty image");
        }

        Ok(image)
    }
}
