//! E-mail delivery through the Mailjet v3.1 send API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use slotbot_core::config::{EmailConfig, NotifyConfig};
use slotbot_core::errors::NotificationError;
use slotbot_core::notify::{ChannelKind, NotificationChannel, NotificationMessage};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct MailjetSettings {
    pub api_url: String,
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub to_name: String,
}

impl MailjetSettings {
    /// `None` when email is disabled or its credentials are absent.
    pub fn from_config(email: &EmailConfig, notify: &NotifyConfig) -> Option<Self> {
        if !email.enabled {
            return None;
        }
        Some(Self {
            api_url: email.api_url.clone(),
            api_key: email.api_key.clone()?,
            api_secret: email.api_secret.clone()?,
            from_address: email.from_address.clone()?,
            from_name: email.from_name.clone(),
            to_address: notify.target.clone(),
            to_name: email.to_name.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    #[serde(rename = "Messages")]
    messages: [MailjetMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MailjetMessage<'a> {
    from: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: &'a str,
    text_part: String,
    #[serde(rename = "HTMLPart")]
    html_part: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

pub struct MailjetChannel {
    client: Client,
    settings: MailjetSettings,
}

impl MailjetChannel {
    pub fn new(client: Client, settings: MailjetSettings) -> Self {
        Self { client, settings }
    }

    fn payload<'a>(&'a self, message: &'a NotificationMessage) -> SendRequest<'a> {
        let text = message.text();
        SendRequest {
            messages: [MailjetMessage {
                from: Contact {
                    email: &self.settings.from_address,
                    name: &self.settings.from_name,
                },
                to: [Contact { email: &self.settings.to_address, name: &self.settings.to_name }],
                subject: &message.subject,
                html_part: text.replace('\n', "<br>"),
                text_part: text,
            }],
        }
    }
}

#[async_trait]
impl NotificationChannel for MailjetChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let payload = self.payload(message);
        debug!(subject = %message.subject, "posting mailjet send request");

        let response = self
            .client
            .post(&self.settings.api_url)
            .basic_auth(
                self.settings.api_key.expose_secret(),
                Some(self.settings.api_secret.expose_secret()),
            )
            .json(&payload)
            .send()
            .await
            .map_err(|error| NotificationError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Rejected { status: status.as_u16(), body })
    }
}
