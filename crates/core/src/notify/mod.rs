//! Notification policy and channel fan-out.
//!
//! - `message` decides what (if anything) to say about an [`AggregationResult`]
//! - `dispatcher` sends it to every configured [`NotificationChannel`] concurrently
//!
//! [`AggregationResult`]: crate::domain::slot::AggregationResult

pub mod dispatcher;
pub mod message;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::NotificationError;

pub use dispatcher::{ChannelOutcome, NotificationDispatcher};
pub use message::{MessageKind, NotificationMessage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Report every run, including "no slots" runs.
    Always,
    /// Stay silent unless at least one slot is available.
    OnAvailabilityOnly,
}

impl NotifyMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Some(Self::Always),
            "on_availability_only" | "on_availability" => Some(Self::OnAvailabilityOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::OnAvailabilityOnly => "on_availability_only",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Chat,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError>;
}
