pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use slotbot_core::domain::slot::SlotType;
use slotbot_core::notify::NotifyMode;

use crate::commands::check::CheckArgs;
use crate::commands::plan::PlanArgs;

#[derive(Debug, Parser)]
#[command(
    name = "slotbot",
    about = "Grocery delivery slot watcher",
    long_about = "Check upcoming delivery slots for an online grocery account and notify by e-mail or chat.",
    after_help = "Examples:\n  slotbot check\n  slotbot check --dry-run --weeks 2\n  slotbot plan --date 2020-04-10\n  slotbot doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to a slotbot.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Log in, query upcoming slots and send notifications")]
    Check {
        #[arg(long, value_name = "N", help = "Number of weeks to look ahead")]
        weeks: Option<u32>,
        #[arg(long, value_parser = parse_mode, help = "always | on_availability_only")]
        mode: Option<NotifyMode>,
        #[arg(long, value_parser = parse_slot_type, help = "fixed_1hr | flexi_saver")]
        slot_type: Option<SlotType>,
        #[arg(long = "location", value_name = "ID", help = "Store location to query")]
        location_id: Option<u32>,
        #[arg(long, value_name = "EMAIL", help = "E-mail recipient for this run")]
        to: Option<String>,
        #[arg(long, value_name = "LEVEL", help = "Log level filter (e.g. debug)")]
        log_level: Option<String>,
        #[arg(long, help = "Compose the notification and print it instead of sending")]
        dry_run: bool,
    },
    #[command(about = "Print the query windows and request URLs without any network access")]
    Plan {
        #[arg(long, value_name = "N", help = "Number of weeks to look ahead")]
        weeks: Option<u32>,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Reference date (defaults to today)")]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_slot_type, help = "fixed_1hr | flexi_saver")]
        slot_type: Option<SlotType>,
        #[arg(long = "location", value_name = "ID", help = "Store location to query")]
        location_id: Option<u32>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, channel readiness and retailer reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn parse_mode(raw: &str) -> Result<NotifyMode, String> {
    NotifyMode::parse(raw)
        .ok_or_else(|| format!("unknown notify mode `{raw}` (expected always|on_availability_only)"))
}

fn parse_slot_type(raw: &str) -> Result<SlotType, String> {
    SlotType::parse(raw)
        .ok_or_else(|| format!("unknown slot type `{raw}` (expected fixed_1hr|flexi_saver)"))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check { weeks, mode, slot_type, location_id, to, log_level, dry_run } => {
            commands::check::run(CheckArgs {
                config_path: cli.config,
                weeks,
                mode,
                slot_type,
                location_id,
                target: to,
                log_level,
                dry_run,
            })
        }
        Command::Plan { weeks, date, slot_type, location_id } => {
            commands::plan::run(PlanArgs {
                config_path: cli.config,
                weeks,
                date,
                slot_type,
                location_id,
            })
        }
        Command::Config => commands::config::run(cli.config),
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(cli.config, json),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
