use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use slotbot_core::config::{AppConfig, ConfigOverrides};
use toml::Value;

use crate::commands::{load_options, CommandResult, EXIT_CONFIG};

const COMMAND: &str = "config";

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config =
        match AppConfig::load(load_options(config_path.clone(), ConfigOverrides::default())) {
            Ok(config) => config,
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "config_validation",
                    format!("config validation failed: {error}"),
                    EXIT_CONFIG,
                )
            }
        };

    CommandResult::success(COMMAND, render(&config, config_path.as_deref()))
}

pub fn render(config: &AppConfig, explicit_path: Option<&Path>) -> String {
    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = vec![
        entry(
            "retailer.base_url",
            config.retailer.base_url.clone(),
            &["SLOTBOT_RETAILER_BASE_URL"],
        ),
        entry(
            "retailer.slots_path",
            config.retailer.slots_path.clone(),
            &["SLOTBOT_RETAILER_SLOTS_PATH"],
        ),
        entry(
            "retailer.login_url",
            config.retailer.login_url.clone(),
            &["SLOTBOT_RETAILER_LOGIN_URL"],
        ),
        entry(
            "retailer.username",
            redact_address(config.retailer.username.expose_secret()),
            &["SLOTBOT_RETAILER_USERNAME"],
        ),
        entry(
            "retailer.password",
            redact_secret(Some(&config.retailer.password)),
            &["SLOTBOT_RETAILER_PASSWORD"],
        ),
        entry(
            "retailer.request_timeout_secs",
            config.retailer.request_timeout_secs.to_string(),
            &["SLOTBOT_RETAILER_REQUEST_TIMEOUT_SECS"],
        ),
        entry(
            "query.look_ahead_weeks",
            config.query.look_ahead_weeks.to_string(),
            &["SLOTBOT_QUERY_LOOK_AHEAD_WEEKS"],
        ),
        entry("query.slot_type", config.query.slot_type.to_string(), &["SLOTBOT_QUERY_SLOT_TYPE"]),
        entry(
            "query.location_id",
            config.query.location_id.map(|id| id.to_string()).unwrap_or_else(|| "<unset>".into()),
            &["SLOTBOT_QUERY_LOCATION_ID"],
        ),
        entry("query.location_param", config.query.location_param.clone(), &[]),
        entry("notify.mode", config.notify.mode.as_str().to_string(), &["SLOTBOT_NOTIFY_MODE"]),
        entry("notify.target", redact_address(&config.notify.target), &["SLOTBOT_NOTIFY_TARGET"]),
        entry("notify.timezone", config.notify.timezone.clone(), &["SLOTBOT_NOTIFY_TIMEZONE"]),
        entry(
            "notify.booking_link",
            config.notify.booking_link.to_string(),
            &["SLOTBOT_NOTIFY_BOOKING_LINK"],
        ),
        entry("email.enabled", config.email.enabled.to_string(), &["SLOTBOT_EMAIL_ENABLED"]),
        entry("email.api_url", config.email.api_url.clone(), &[]),
        entry(
            "email.api_key",
            redact_secret(config.email.api_key.as_ref()),
            &["SLOTBOT_EMAIL_API_KEY"],
        ),
        entry(
            "email.api_secret",
            redact_secret(config.email.api_secret.as_ref()),
            &["SLOTBOT_EMAIL_API_SECRET"],
        ),
        entry(
            "email.from_address",
            config.email.from_address.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["SLOTBOT_EMAIL_FROM_ADDRESS"],
        ),
        entry(
            "chat.webhook_url",
            redact_webhook(config.chat.webhook_url.as_ref()),
            &["SLOTBOT_CHAT_WEBHOOK_URL"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["SLOTBOT_LOGGING_LEVEL", "SLOTBOT_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["SLOTBOT_LOGGING_FORMAT", "SLOTBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key, value, env_keys)
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("slotbot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/slotbot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        Some(_) => "<empty>".to_string(),
        None => "<unset>".to_string(),
    }
}

/// Keeps the first character and the domain: `s***@example.com`.
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "<redacted>".to_string(),
    }
}

/// Keeps scheme and host; the path of a webhook URL is the credential.
fn redact_webhook(url: Option<&SecretString>) -> String {
    let Some(url) = url else {
        return "<unset>".to_string();
    };
    let raw = url.expose_secret();
    match raw.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or_default();
            format!("{scheme}://{host}/***")
        }
        None => "<redacted>".to_string(),
    }
}
