use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use slotbot_core::config::{AppConfig, ConfigOverrides};
use slotbot_core::domain::slot::SlotType;
use slotbot_core::notify::NotifyMode;
use slotbot_core::run::{PipelineSettings, RunStatus, SlotCheckPipeline};
use slotbot_core::session::SessionProvider;
use slotbot_core::RunContext;
use slotbot_notify::channels_from_config;
use slotbot_session::{HttpSessionProvider, HttpSessionSettings};
use tokio::runtime::Runtime;

use crate::commands::{
    load_options, CommandResult, EXIT_CHANNEL_FAILURE, EXIT_CONFIG, EXIT_UNEXPECTED,
};
use crate::logging::init_logging;

const COMMAND: &str = "check";

#[derive(Clone, Debug, Default)]
pub struct CheckArgs {
    pub config_path: Option<PathBuf>,
    pub weeks: Option<u32>,
    pub mode: Option<NotifyMode>,
    pub slot_type: Option<SlotType>,
    pub location_id: Option<u32>,
    pub target: Option<String>,
    pub log_level: Option<String>,
    pub dry_run: bool,
}

pub fn run(args: CheckArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        look_ahead_weeks: args.weeks,
        slot_type: args.slot_type,
        location_id: args.location_id,
        notify_mode: args.mode,
        notify_target: args.target,
        log_level: args.log_level,
    };
    let config = match AppConfig::load(load_options(args.config_path.clone(), overrides)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    init_logging(&config);

    let settings = match PipelineSettings::from_config(&config) {
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

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("{error:#}"),
                EXIT_UNEXPECTED,
            )
        }
    };

    let provider: Arc<dyn SessionProvider> =
        Arc::new(HttpSessionProvider::new(HttpSessionSettings::from(&config.retailer)));
    runtime.block_on(execute(&config, settings, provider, args.dry_run))
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}

pub async fn execute(
    config: &AppConfig,
    settings: PipelineSettings,
    provider: Arc<dyn SessionProvider>,
    dry_run: bool,
) -> CommandResult {
    let channels = match channels_from_config(config) {
        Ok(channels) => channels,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "notification_setup",
                error.to_string(),
                EXIT_UNEXPECTED,
            )
        }
    };

    let pipeline = SlotCheckPipeline::new(settings, provider, channels);
    let context = RunContext::generate();
    let reference = pipeline.settings().today();

    if dry_run {
        return match pipeline.collect(reference, &context).await {
            Ok(result) => {
                let details = serde_json::json!({
                    "correlation_id": context.correlation_id,
                    "reference_date": reference,
                    "total_queried": result.total_queried,
                    "available": result.available_slots.len(),
                });
                let message = pipeline
                    .dispatcher()
                    .compose(&result)
                    .map(|message| format!("{}\n{}", message.subject, message.text()))
                    .unwrap_or_else(|| "dry run: nothing would be sent".to_string());
                CommandResult::success_with_details(COMMAND, message, Some(details))
            }
            Err(error) => CommandResult::failure(
                COMMAND,
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            ),
        };
    }

    match pipeline.run(reference, &context).await {
        Ok(report) => {
            let details = serde_json::to_value(&report).ok();
            match report.status() {
                RunStatus::ChannelFailure => CommandResult::failure_with_details(
                    COMMAND,
                    "notification",
                    format!("notification failed on: {}", report.failed_channels().join(", ")),
                    EXIT_CHANNEL_FAILURE,
                    details,
                ),
                RunStatus::Notified => CommandResult::success_with_details(
                    COMMAND,
                    format!(
                        "{} of {} slots available; notification sent",
                        report.available, report.total_queried
                    ),
                    details,
                ),
                RunStatus::Silent => CommandResult::success_with_details(
                    COMMAND,
                    format!("no available slots among {}; nothing sent", report.total_queried),
                    details,
                ),
            }
        }
        Err(error) => CommandResult::failure(
            COMMAND,
            error.error_class(),
            error.to_string(),
            error.exit_code(),
        ),
    }
}
