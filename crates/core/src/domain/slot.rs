use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub String);

/// One bookable delivery window as reported by the retailer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub start: DateTime<FixedOffset>,
    /// Raw status token; compared case-insensitively.
    pub status: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    #[serde(rename = "fixed_1hr")]
    Fixed1Hr,
    #[serde(rename = "flexi_saver")]
    FlexiSaver,
}

impl SlotType {
    /// Value of the `slotGroup` query parameter.
    pub fn group_code(self) -> u8 {
        match self {
            Self::Fixed1Hr => 1,
            Self::FlexiSaver => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed1Hr => "fixed_1hr",
            Self::FlexiSaver => "flexi_saver",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed_1hr" | "fixed1hr" | "fixed" => Some(Self::Fixed1Hr),
            "flexi_saver" | "flexisaver" | "flexi" => Some(Self::FlexiSaver),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single day's slot query. Built by the planner and consumed once by the fetcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub date: NaiveDate,
    pub slot_type: SlotType,
    pub location_id: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub available_slots: Vec<Slot>,
    pub unavailable_slots: Vec<Slot>,
    pub total_queried: usize,
    pub windows_queried: usize,
}

impl AggregationResult {
    pub fn has_availability(&self) -> bool {
        !self.available_slots.is_empty()
    }

    /// Appends one window's partitioned slots, keeping window order.
    pub(crate) fn absorb(&mut self, available: Vec<Slot>, unavailable: Vec<Slot>) {
        self.total_queried += available.len() + unavailable.len();
        self.windows_queried += 1;
        self.available_slots.extend(available);
        self.unavailable_slots.extend(unavailable);
    }
}
