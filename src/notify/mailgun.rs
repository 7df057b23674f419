use std::str::FromStr;

use anyhow::{bail, Context};
use async_trait::async_trait;

use super::{MailConfig, Notifier, VideoNotice};

/// Sends notifications through the Mailgun messages API.
pub struct MailgunNotifier {
    endpoint: reqwest::Url,
    config: MailConfig,
    http: reqwest::Client,
}

impl MailgunNotifier {
    pub fn new(config: MailConfig) -> anyhow::Result<Self> {
        if config.send_list.is_empty() {
            bail!("email send list is empty");
        }

        let endpoint = reqwest::Url::from_str(&format!(
            "{}/{}/messages",
            config.api_base.trim_end_matches('/'),
            config.domain
        ))
        .context("invalid mail api url")?;

        Ok(MailgunNotifier {
            endpoint,
            config,
            http: reqwest::Client::new(),
        })
    }

    pub fn subject(&self, notice: &VideoNotice) -> String {
        self.config
            .subject
            .replace("{date}", &notice.created.format("%m/%d/%Y").to_string())
    }

    pub fn message(&self, notice: &VideoNotice) -> String {
        self.config.message.replace("{link}", &notice.link)
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn notify(&self, notice: &VideoNotice) -> anyhow::Result<()> {
        let to = self.config.send_list.join(", ");
        let subject = self.subject(notice);
        let message = self.message(notice);

        debug!("emailing {} about {}", to, notice.link);

        let form = [
            ("from", self.config.from.as_str()),
            ("to", to.as_str()),
            ("subject", subject.as_str()),
            ("text", message.as_str()),
            ("html", message.as_str()),
        ];

        let res = self
            .http
            .post(self.endpoint.clone())
            .basic_auth("api", Some(&self.config.key))
            .form(&form)
            .send()
            .await
            .context("could not reach mail api")?;

        let status = res.status();
        let body = res.text().await.unwrap_or_default();

        if !status.is_success() {
            bail!("mail api returned {}: {}", status, body.trim());
        }

        info!("sent video email to {}", to);
        trace!("mail api response: {}", body.trim());

        Ok(())
    }
}
