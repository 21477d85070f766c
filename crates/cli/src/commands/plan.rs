use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use slotbot_core::config::{AppConfig, ConfigOverrides};
use slotbot_core::domain::slot::SlotType;
use slotbot_core::run::PipelineSettings;

use crate::commands::{load_options, CommandResult, EXIT_CONFIG};

const COMMAND: &str = "plan";
const EXIT_PLAN: u8 = 4;

#[derive(Clone, Debug, Default)]
pub struct PlanArgs {
    pub config_path: Option<PathBuf>,
    pub weeks: Option<u32>,
    pub date: Option<NaiveDate>,
    pub slot_type: Option<SlotType>,
    pub location_id: Option<u32>,
}

#[derive(Debug, Serialize)]
struct PlannedWindow {
    date: NaiveDate,
    slot_type: SlotType,
    location_id: Option<u32>,
    url: String,
}

/// Prints the windows and request URLs a check would use. Never touches the network and
/// does not need credentials or a notification channel.
pub fn run(args: PlanArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        look_ahead_weeks: args.weeks,
        slot_type: args.slot_type,
        location_id: args.location_id,
        ..ConfigOverrides::default()
    };
    let settings = match AppConfig::load_for_planning(load_options(args.config_path, overrides))
        .and_then(|config| PipelineSettings::from_config(&config))
    {
        Ok(settings) => settings,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let reference = args.date.unwrap_or_else(|| settings.today());
    let windows = match settings.planner().plan(reference) {
        Ok(windows) => windows,
        Err(error) => {
            return CommandResult::failure(COMMAND, "planning", error.to_string(), EXIT_PLAN)
        }
    };

    let fetcher = settings.fetcher();
    let planned: Vec<PlannedWindow> = windows
        .iter()
        .map(|window| PlannedWindow {
            date: window.date,
            slot_type: window.slot_type,
            location_id: window.location_id,
            url: fetcher.request_url(window),
        })
        .collect();

    let message = format!("{} window(s) from {reference}", planned.len());
    CommandResult::success_with_details(COMMAND, message, serde_json::to_value(&planned).ok())
}
