use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use slotbot_core::config::{AppConfig, ConfigOverrides};

use crate::commands::load_options;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(load_options(config_path, ConfigOverrides::default())) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_channels(&config));
            checks.push(check_retailer_reachability(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("channel_readiness"));
            checks.push(skipped("retailer_reachability"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_channels(config: &AppConfig) -> DoctorCheck {
    let mut active = Vec::new();
    if config.email_active() {
        active.push(format!("email -> {}", config.notify.target));
    }
    if config.chat_active() {
        active.push("chat webhook".to_string());
    }

    DoctorCheck {
        name: "channel_readiness",
        status: if active.is_empty() { CheckStatus::Fail } else { CheckStatus::Pass },
        details: if active.is_empty() {
            "no notification channel is active".to_string()
        } else {
            format!("active channels: {}", active.join(", "))
        },
    }
}

fn check_retailer_reachability(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "retailer_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let login_url = config.retailer.login_url.clone();
    let timeout = Duration::from_secs(config.retailer.request_timeout_secs);
    let result = runtime.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| format!("failed to build http client: {error}"))?;
        let response = client
            .get(&login_url)
            .send()
            .await
            .map_err(|error| format!("login page unreachable: {error}"))?;
        Ok::<_, String>(response.status())
    });

    match result {
        Ok(status) if status.is_success() => DoctorCheck {
            name: "retailer_reachability",
            status: CheckStatus::Pass,
            details: format!("login page `{login_url}` answered {status}"),
        },
        Ok(status) => DoctorCheck {
            name: "retailer_reachability",
            status: CheckStatus::Fail,
            details: format!("login page `{login_url}` answered {status}"),
        },
        Err(error) => {
            DoctorCheck { name: "retailer_reachability", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
