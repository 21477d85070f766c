use chrono::{Days, NaiveDate};

use crate::domain::slot::{QueryWindow, SlotType};
use crate::errors::PlanError;

pub const DAYS_PER_WEEK: u64 = 7;

/// One window per week offset `0, 7, 14, ...` days from `reference`, in ascending order.
pub fn plan(
    reference: NaiveDate,
    look_ahead_weeks: i32,
    slot_type: SlotType,
    location_id: Option<u32>,
) -> Result<Vec<QueryWindow>, PlanError> {
    if look_ahead_weeks < 0 {
        return Err(PlanError::NegativeLookAhead(look_ahead_weeks));
    }

    (0..look_ahead_weeks)
        .map(|week| {
            let offset = Days::new(DAYS_PER_WEEK * week as u64);
            let date = reference.checked_add_days(offset).ok_or(PlanError::DateOverflow(week))?;
            Ok(QueryWindow { date, slot_type, location_id })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotQueryPlanner {
    pub look_ahead_weeks: i32,
    pub slot_type: SlotType,
    pub location_id: Option<u32>,
}

impl SlotQueryPlanner {
    pub fn plan(&self, reference: NaiveDate) -> Result<Vec<QueryWindow>, PlanError> {
        plan(reference, self.look_ahead_weeks, self.slot_type, self.location_id)
    }
}
