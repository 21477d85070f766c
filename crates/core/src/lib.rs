//! Delivery-slot availability checks for an online grocery account.
//!
//! A run plans one query per week, reads slots through an authenticated
//! [`session::SessionGrant`], aggregates them and hands the result to the
//! notification channels.

pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod run;
pub mod session;
pub mod slots;

#[cfg(test)]
mod testing;

use uuid::Uuid;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::slot::{AggregationResult, QueryWindow, Slot, SlotId, SlotType};
pub use errors::{
    AuthenticationError, FetchError, NotificationError, PlanError, RunError, SessionError,
    SlotError,
};
pub use notify::{
    ChannelKind, ChannelOutcome, MessageKind, NotificationChannel, NotificationDispatcher,
    NotificationMessage, NotifyMode,
};
pub use run::{PipelineSettings, RunReport, RunStatus, SlotCheckPipeline};
pub use session::{AuthenticatedSession, SessionGrant, SessionProvider};

/// Per-run identity threaded through every structured log event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunContext {
    pub correlation_id: String,
}

impl RunContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}
