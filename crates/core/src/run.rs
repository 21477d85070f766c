//! One slot check: plan, open session, aggregate sequentially, release session, dispatch.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::domain::slot::{AggregationResult, SlotType};
use crate::errors::RunError;
use crate::notify::message::{MessageComposer, MessageKind};
use crate::notify::{ChannelOutcome, NotificationChannel, NotificationDispatcher, NotifyMode};
use crate::session::SessionProvider;
use crate::slots::aggregator::SlotAggregator;
use crate::slots::fetcher::SlotFetcher;
use crate::slots::format::SlotTimeFormatter;
use crate::slots::planner::SlotQueryPlanner;
use crate::RunContext;

/// Everything a run needs, fixed at construction time.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub slots_url: String,
    pub location_param: String,
    pub look_ahead_weeks: i32,
    pub slot_type: SlotType,
    pub location_id: Option<u32>,
    pub mode: NotifyMode,
    pub timezone: Tz,
    pub booking_link: Option<String>,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let look_ahead_weeks = i32::try_from(config.query.look_ahead_weeks).map_err(|_| {
            ConfigError::Validation("query.look_ahead_weeks is out of range".to_string())
        })?;
        let slots_url = config.retailer.slots_url();

        Ok(Self {
            booking_link: config.notify.booking_link.then(|| slots_url.clone()),
            slots_url,
            location_param: config.query.location_param.clone(),
            look_ahead_weeks,
            slot_type: config.query.slot_type,
            location_id: config.query.location_id,
            mode: config.notify.mode,
            timezone: config.notify.timezone()?,
        })
    }

    /// Calendar day "now" in the configured zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub fn planner(&self) -> SlotQueryPlanner {
        SlotQueryPlanner {
            look_ahead_weeks: self.look_ahead_weeks,
            slot_type: self.slot_type,
            location_id: self.location_id,
        }
    }

    pub fn fetcher(&self) -> SlotFetcher {
        SlotFetcher::new(self.slots_url.clone()).with_location_param(self.location_param.clone())
    }

    pub fn composer(&self) -> MessageComposer {
        MessageComposer::new(
            self.mode,
            SlotTimeFormatter::new(self.timezone),
            self.booking_link.clone(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Notified,
    Silent,
    ChannelFailure,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub correlation_id: String,
    pub reference_date: NaiveDate,
    pub windows_queried: usize,
    pub total_queried: usize,
    pub available: usize,
    pub unavailable: usize,
    pub message: Option<MessageKind>,
    pub outcomes: Vec<ChannelOutcome>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.outcomes.iter().any(|outcome| !outcome.succeeded()) {
            RunStatus::ChannelFailure
        } else if self.message.is_some() {
            RunStatus::Notified
        } else {
            RunStatus::Silent
        }
    }

    pub fn failed_channels(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .map(|outcome| outcome.channel.as_str())
            .collect()
    }
}

pub struct SlotCheckPipeline {
    settings: PipelineSettings,
    provider: Arc<dyn SessionProvider>,
    aggregator: SlotAggregator,
    dispatcher: NotificationDispatcher,
}

impl SlotCheckPipeline {
    pub fn new(
        settings: PipelineSettings,
        provider: Arc<dyn SessionProvider>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        let aggregator = SlotAggregator::new(settings.fetcher());
        let dispatcher = NotificationDispatcher::new(settings.composer(), channels);
        Self { settings, provider, aggregator, dispatcher }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Plans, authenticates and aggregates. The session is closed whether or not aggregation
    /// succeeded; a failed window discards everything gathered so far.
    pub async fn collect(
        &self,
        reference: NaiveDate,
        context: &RunContext,
    ) -> Result<AggregationResult, RunError> {
        let windows = self.settings.planner().plan(reference)?;

        let session = match self.provider.open().await {
            Ok(session) => session,
            Err(error) => {
                error!(
                    event_name = "session.failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "could not establish retailer session"
                );
                return Err(error.into());
            }
        };
        info!(
            event_name = "session.opened",
            correlation_id = %context.correlation_id,
            windows = windows.len(),
            "retailer session established"
        );

        let aggregated = self.aggregator.aggregate(&session, &windows, context).await;

        match session.close().await {
            Ok(()) => info!(
                event_name = "session.closed",
                correlation_id = %context.correlation_id,
                "retailer session closed"
            ),
            Err(error) => warn!(
                event_name = "session.closed",
                correlation_id = %context.correlation_id,
                error = %error,
                "retailer session did not close cleanly"
            ),
        }

        aggregated.map_err(RunError::from)
    }

    pub async fn run(
        &self,
        reference: NaiveDate,
        context: &RunContext,
    ) -> Result<RunReport, RunError> {
        info!(
            event_name = "run.start",
            correlation_id = %context.correlation_id,
            reference_date = %reference,
            look_ahead_weeks = self.settings.look_ahead_weeks,
            slot_type = %self.settings.slot_type,
            mode = self.settings.mode.as_str(),
            "starting slot check"
        );

        let result = self.collect(reference, context).await?;
        let (message, outcomes) = self.dispatcher.dispatch(&result, context).await;

        let report = RunReport {
            correlation_id: context.correlation_id.clone(),
            reference_date: reference,
            windows_queried: result.windows_queried,
            total_queried: result.total_queried,
            available: result.available_slots.len(),
            unavailable: result.unavailable_slots.len(),
            message: message.map(|message| message.kind),
            outcomes,
        };

        info!(
            event_name = "run.finished",
            correlation_id = %context.correlation_id,
            status = ?report.status(),
            total_queried = report.total_queried,
            available = report.available,
            "slot check finished"
        );
        Ok(report)
    }
}
