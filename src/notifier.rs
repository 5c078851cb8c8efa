// =============================================================================
// notifier.rs — THE SIREN
// =============================================================================
//
// Everything fresh from one pass goes out as a single Telegram message, one
// block per announcement, newest first. No token or no chat id means nobody
// is listening: the run carries on and says so in the logs.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::NotifyError;
use crate::models::Announcement;

/// Characters of a rejection body kept for the error.
const REJECTION_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent { status: u16 },
    /// Credentials missing, nothing was sent.
    Skipped,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `blocks` as one message, separated by blank lines.
    async fn notify(&self, blocks: &[String]) -> Result<DeliveryStatus, NotifyError>;
}

/// Render one announcement as an alert block. Title and URL are HTML-escaped
/// because the message is sent with `parse_mode = HTML`.
pub fn format_block(ann: &Announcement) -> String {
    let when = ann
        .published_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "🚨 <b>New Listing Alert</b>\n🏦 Exchange: <b>{}</b>\n🧾 {}\n🕒 {}\n🔗 {}",
        ann.exchange,
        html_escape::encode_text(&ann.title),
        when,
        html_escape::encode_text(&ann.url)
    )
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: Option<String>,
        chat_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        Self::new(
            config.telegram_api_base.clone(),
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
            config.request_timeout,
        )
    }

    fn credentials(&self) -> Result<(&str, &str), NotifyError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or(NotifyError::MissingCredentials("TELEGRAM_BOT_TOKEN"))?;
        let chat = self
            .chat_id
            .as_deref()
            .ok_or(NotifyError::MissingCredentials("TELEGRAM_CHAT_ID"))?;
        Ok((token, chat))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, blocks: &[String]) -> Result<DeliveryStatus, NotifyError> {
        let (token, chat_id) = match self.credentials() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, blocks = blocks.len(), "Telegram not configured, dropping notification");
                return Ok(DeliveryStatus::Skipped);
            }
        };

        let text = blocks.join("\n\n");
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let payload = SendMessage {
            chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // The request URL carries the bot token, so it is stripped from transport errors.
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(REJECTION_BODY_LIMIT).collect(),
            });
        }

        info!(status = status.as_u16(), blocks = blocks.len(), "Telegram message sent");
        Ok(DeliveryStatus::Sent { status: status.as_u16() })
    }
}

/// Records every batch it is handed.
#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub batches: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingNotifier {
        pub fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, blocks: &[String]) -> Result<DeliveryStatus, NotifyError> {
            self.batches.lock().unwrap().push(blocks.to_vec());
            Ok(DeliveryStatus::Sent { status: 200 })
        }
    }
}
