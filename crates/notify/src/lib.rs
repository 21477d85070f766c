//! Delivery channels for slot notifications.

pub mod mailjet;
pub mod slack;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use slotbot_core::config::AppConfig;
use slotbot_core::errors::NotificationError;
use slotbot_core::notify::NotificationChannel;

pub use mailjet::{MailjetChannel, MailjetSettings};
pub use slack::SlackWebhookChannel;

const CHANNEL_TIMEOUT: Duration = Duration::from_secs(15);

/// Every channel the configuration enables, email first.
pub fn channels_from_config(
    config: &AppConfig,
) -> Result<Vec<Arc<dyn NotificationChannel>>, NotificationError> {
    let client = Client::builder()
        .timeout(CHANNEL_TIMEOUT)
        .build()
        .map_err(|error| NotificationError::Transport(error.to_string()))?;

    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    if let Some(settings) = MailjetSettings::from_config(&config.email, &config.notify) {
        channels.push(Arc::new(MailjetChannel::new(client.clone(), settings)));
    }
    if let Some(webhook_url) = &config.chat.webhook_url {
        channels.push(Arc::new(SlackWebhookChannel::new(client, webhook_url.clone())));
    }
    Ok(channels)
}
