use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::SlackConfig;

const BOT_USERNAME: &str = "Claude Code Bot";
const BOT_ICON: &str = ":robot_face:";

/// Body of a `chat.postMessage` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reply_broadcast: bool,
}

impl PostMessage {
    pub fn new(channel: &str, text: &str) -> Self {
        PostMessage {
            channel: channel.to_string(),
            text: text.to_string(),
            username: BOT_USERNAME.to_string(),
            icon_emoji: BOT_ICON.to_string(),
            thread_ts: None,
            reply_broadcast: false,
        }
    }
}

/// Relevant part of the Slack API response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostResponse {
    pub ok: bool,
    pub ts: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("Slack request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Slack returned HTTP {0}")]
    Status(u16),
}

/// Chat delivery seam; the real client talks HTTPS, tests record calls
pub trait ChatClient {
    /// Post a message and return its `ts` on success
    fn post_message(&self, message: &PostMessage) -> Result<String, SlackError>;
}

/// Blocking `chat.postMessage` client with a bounded timeout
pub struct SlackClient {
    http: reqwest::blocking::Client,
    api_url: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self, SlackError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(SlackClient {
            http,
            api_url: config.api_url.clone(),
            bot_token: config.bot_token.clone().unwrap_or_default(),
        })
    }
}

impl ChatClient for SlackClient {
    fn post_message(&self, message: &PostMessage) -> Result<String, SlackError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.bot_token)
            .json(message)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Status(status.as_u16()));
        }

        let body: PostResponse = response.json()?;
        if !body.ok {
            return Err(SlackError::Api(
                body.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        // A successful post without ts cannot root a thread; treat it as ""
        Ok(body.ts.unwrap_or_default())
    }
}
