use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("invalid slot record: {0}")]
    InvalidSlot(String),
    #[error("invalid slot timestamp `{raw}`")]
    InvalidTimestamp { raw: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session transport failed: {0}")]
    Transport(String),
    #[error("session request to `{url}` returned status {status}")]
    Status { status: u16, url: String },
    #[error("session response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("login page unreachable: {0}")]
    Unreachable(String),
    #[error("login was rejected: {0}")]
    Rejected(String),
    #[error("secondary token not found using selector `{selector}`")]
    TokenMissing { selector: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("slot query for {date} failed: {source}")]
    Request {
        date: NaiveDate,
        #[source]
        source: SessionError,
    },
    #[error("slot response for {date} is malformed: {message}")]
    MalformedResponse { date: NaiveDate, message: String },
    #[error("slot response for {date} contains an invalid slot: {source}")]
    InvalidSlot {
        date: NaiveDate,
        #[source]
        source: SlotError,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("look-ahead weeks must not be negative (got {0})")]
    NegativeLookAhead(i32),
    #[error("query date overflowed the calendar at week offset {0}")]
    DateOverflow(i32),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("notification payload could not be built: {0}")]
    Serialization(String),
}

/// Failures that abort a slot check before anything is dispatched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl RunError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Authentication(_) => "authentication",
            Self::Plan(_) => "planning",
            Self::Fetch(FetchError::Request { .. }) => "fetch",
            Self::Fetch(_) => "malformed_response",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Authentication(_) => 3,
            Self::Plan(_) | Self::Fetch(_) => 4,
        }
    }
}
