use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;

use crate::domain::slot::Slot;
use crate::errors::SlotError;

/// Long weekday, long month, day and 12-hour time, e.g. `Friday, April 10, 8:00 AM`.
pub const SLOT_LABEL_FORMAT: &str = "%A, %B %-d, %-I:%M %p";

/// Parses a slot `start` value. Timestamps without an offset are read as UTC.
pub fn parse_start(raw: &str) -> Result<DateTime<FixedOffset>, SlotError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed);
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| SlotError::InvalidTimestamp { raw: raw.to_owned() })
}

#[derive(Clone, Copy, Debug)]
pub struct SlotTimeFormatter {
    timezone: Tz,
}

impl Default for SlotTimeFormatter {
    fn default() -> Self {
        Self { timezone: chrono_tz::Europe::London }
    }
}

impl SlotTimeFormatter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn format(&self, slot: &Slot) -> String {
        self.label(slot.start)
    }

    pub fn format_raw(&self, raw: &str) -> Result<String, SlotError> {
        parse_start(raw).map(|start| self.label(start))
    }

    fn label(&self, start: DateTime<FixedOffset>) -> String {
        start.with_timezone(&self.timezone).format(SLOT_LABEL_FORMAT).to_string()
    }
}
