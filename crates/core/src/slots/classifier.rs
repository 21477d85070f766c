//! Availability verdicts for raw slot statuses.
//!
//! The policy is open-world: only the statuses listed in [`UNAVAILABLE_STATUSES`]
//! count as unavailable, everything else the retailer reports is treated as bookable.

use crate::domain::slot::Slot;

pub const UNAVAILABLE_STATUSES: [&str; 2] = ["unavailable", "booked"];

pub fn is_available_status(status: &str) -> bool {
    let normalized = status.to_lowercase();
    !UNAVAILABLE_STATUSES.contains(&normalized.as_str())
}

pub fn classify(slot: &Slot) -> bool {
    is_available_status(&slot.status)
}

/// Splits slots into `(available, unavailable)`, keeping the input order in both halves.
pub fn partition(slots: Vec<Slot>) -> (Vec<Slot>, Vec<Slot>) {
    slots.into_iter().partition(classify)
}
