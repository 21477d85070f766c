use tracing::info;

use crate::domain::slot::{AggregationResult, QueryWindow};
use crate::errors::FetchError;
use crate::session::SessionGrant;
use crate::slots::classifier;
use crate::slots::fetcher::SlotFetcher;
use crate::RunContext;

#[derive(Clone, Debug)]
pub struct SlotAggregator {
    fetcher: SlotFetcher,
}

impl SlotAggregator {
    pub fn new(fetcher: SlotFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &SlotFetcher {
        &self.fetcher
    }

    /// Queries every window in order. The first failing window aborts the whole aggregation.
    pub async fn aggregate(
        &self,
        session: &SessionGrant,
        windows: &[QueryWindow],
        context: &RunContext,
    ) -> Result<AggregationResult, FetchError> {
        let mut result = AggregationResult::default();

        for (index, window) in windows.iter().enumerate() {
            info!(
                event_name = "slots.window.queried",
                correlation_id = %context.correlation_id,
                week = index + 1,
                date = %window.date,
                slot_type = %window.slot_type,
                "querying slots"
            );

            let slots = self.fetcher.fetch(session, window).await?;
            let found = slots.len();
            let (available, unavailable) = classifier::partition(slots);

            info!(
                event_name = "slots.window.counted",
                correlation_id = %context.correlation_id,
                week = index + 1,
                date = %window.date,
                found,
                available = available.len(),
                unavailable = unavailable.len(),
                "slots found"
            );

            result.absorb(available, unavailable);
        }

        Ok(result)
    }
}
