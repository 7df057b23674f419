use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// The sending domain registered with the mail provider
    pub domain: String,
    pub key: String,
    pub from: String,
    pub send_list: Vec<String>,

    /// Subject line; `{date}` is replaced with the local date
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Message body, sent as both text and html; `{link}` is replaced with
    /// the url of the video
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_api_base() -> String {
    "https://api.mailgun.net/v3".into()
}

fn default_subject() -> String {
    "Timelapse ({date})".into()
}

fn default_message() -> String {
    "A new timelapse is ready: {link}".into()
}
