use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::slot::AggregationResult;
use crate::errors::NotificationError;
use crate::notify::message::{MessageComposer, NotificationMessage};
use crate::notify::{ChannelKind, NotificationChannel, NotifyMode};
use crate::RunContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub result: Result<(), NotificationError>,
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for ChannelOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ChannelOutcome", 3)?;
        state.serialize_field("channel", &self.channel)?;
        state.serialize_field("status", if self.succeeded() { "sent" } else { "failed" })?;
        state.serialize_field("error", &self.result.as_ref().err().map(ToString::to_string))?;
        state.end()
    }
}

pub struct NotificationDispatcher {
    composer: MessageComposer,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(composer: MessageComposer, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { composer, channels }
    }

    pub fn mode(&self) -> NotifyMode {
        self.composer.mode()
    }

    pub fn channel_kinds(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|channel| channel.kind()).collect()
    }

    pub fn compose(&self, result: &AggregationResult) -> Option<NotificationMessage> {
        self.composer.compose(result)
    }

    /// Composes and sends. A silent run yields no outcomes.
    pub async fn dispatch(
        &self,
        result: &AggregationResult,
        context: &RunContext,
    ) -> (Option<NotificationMessage>, Vec<ChannelOutcome>) {
        let Some(message) = self.compose(result) else {
            info!(
                event_name = "notify.skipped",
                correlation_id = %context.correlation_id,
                mode = self.mode().as_str(),
                "no slots available; notification skipped"
            );
            return (None, Vec::new());
        };

        let outcomes = self.deliver(&message, context).await;
        (Some(message), outcomes)
    }

    /// Sends to every channel at once. Each outcome is independent of the others.
    pub async fn deliver(
        &self,
        message: &NotificationMessage,
        context: &RunContext,
    ) -> Vec<ChannelOutcome> {
        let sends = self.channels.iter().map(|channel| async move {
            let kind = channel.kind();
            let result = channel.send(message).await;
            match &result {
                Ok(()) => info!(
                    event_name = "notify.channel.sent",
                    correlation_id = %context.correlation_id,
                    channel = kind.as_str(),
                    subject = %message.subject,
                    "notification sent"
                ),
                Err(error) => warn!(
                    event_name = "notify.channel.failed",
                    correlation_id = %context.correlation_id,
                    channel = kind.as_str(),
                    error = %error,
                    "notification channel failed"
                ),
            }
            ChannelOutcome { channel: kind, result }
        });

        join_all(sends).await
    }
}
