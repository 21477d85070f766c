use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::slot::{QueryWindow, Slot, SlotId};
use crate::errors::{FetchError, SlotError};
use crate::session::SessionGrant;
use crate::slots::format::parse_start;

pub const DEFAULT_LOCATION_PARAM: &str = "locationId";

/// Wire shape of one entry in the `slots` array. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct SlotRecord {
    id: Option<Value>,
    start: Option<String>,
    status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotFetcher {
    slots_url: String,
    location_param: String,
}

impl SlotFetcher {
    pub fn new(slots_url: impl Into<String>) -> Self {
        Self { slots_url: slots_url.into(), location_param: DEFAULT_LOCATION_PARAM.to_owned() }
    }

    pub fn with_location_param(mut self, location_param: impl Into<String>) -> Self {
        self.location_param = location_param.into();
        self
    }

    pub fn request_url(&self, window: &QueryWindow) -> String {
        let mut url = format!(
            "{}/{}?slotGroup={}",
            self.slots_url.trim_end_matches('/'),
            window.date.format("%Y-%m-%d"),
            window.slot_type.group_code()
        );
        if let Some(location_id) = window.location_id {
            url.push_str(&format!("&{}={location_id}", self.location_param));
        }
        url
    }

    pub async fn fetch(
        &self,
        session: &SessionGrant,
        window: &QueryWindow,
    ) -> Result<Vec<Slot>, FetchError> {
        let url = self.request_url(window);
        let body = session
            .get_json(&url)
            .await
            .map_err(|source| FetchError::Request { date: window.date, source })?;
        parse_slots(window.date, body)
    }
}

pub fn parse_slots(date: NaiveDate, mut body: Value) -> Result<Vec<Slot>, FetchError> {
    let Some(slots) = body.get_mut("slots").map(Value::take) else {
        return Err(FetchError::MalformedResponse {
            date,
            message: "response has no `slots` field".to_owned(),
        });
    };
    let Value::Array(entries) = slots else {
        return Err(FetchError::MalformedResponse {
            date,
            message: "`slots` is not an array".to_owned(),
        });
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let record = serde_json::from_value::<SlotRecord>(entry).map_err(|error| {
                FetchError::MalformedResponse {
                    date,
                    message: format!("slot #{index} has an unexpected shape: {error}"),
                }
            })?;
            into_slot(record).map_err(|source| FetchError::InvalidSlot { date, source })
        })
        .collect()
}

fn into_slot(record: SlotRecord) -> Result<Slot, SlotError> {
    let id = match record.id {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        Some(other) => return Err(SlotError::InvalidSlot(format!("unsupported slot id `{other}`"))),
        None => return Err(SlotError::InvalidSlot("slot is missing `id`".to_owned())),
    };
    let status = record
        .status
        .ok_or_else(|| SlotError::InvalidSlot(format!("slot `{id}` is missing `status`")))?;
    let raw_start = record
        .start
        .ok_or_else(|| SlotError::InvalidSlot(format!("slot `{id}` is missing `start`")))?;
    let start = parse_start(&raw_start)?;

    Ok(Slot { id: SlotId(id), start, status })
}
