pub mod aggregator;
pub mod classifier;
pub mod fetcher;
pub mod format;
pub mod planner;

pub use aggregator::SlotAggregator;
pub use fetcher::SlotFetcher;
pub use format::SlotTimeFormatter;
pub use planner::SlotQueryPlanner;
