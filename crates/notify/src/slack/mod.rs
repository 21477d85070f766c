//! Chat delivery through a Slack incoming webhook.

pub mod blocks;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use slotbot_core::errors::NotificationError;
use slotbot_core::notify::{ChannelKind, NotificationChannel, NotificationMessage};
use tracing::debug;

pub struct SlackWebhookChannel {
    client: Client,
    webhook_url: SecretString,
}

impl SlackWebhookChannel {
    pub fn new(client: Client, webhook_url: SecretString) -> Self {
        Self { client, webhook_url }
    }
}

#[async_trait]
impl NotificationChannel for SlackWebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let template = blocks::slot_message(message);
        let payload = serde_json::to_value(&template)
            .map_err(|error| NotificationError::Serialization(error.to_string()))?;
        debug!(blocks = template.blocks.len(), "posting slack webhook message");

        let response = self
            .client
            .post(self.webhook_url.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| NotificationError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Rejected { status: status.as_u16(), body })
    }
}
