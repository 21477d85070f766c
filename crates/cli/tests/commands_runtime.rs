use std::env;
use std::fs;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use slotbot_cli::commands::check::{self, CheckArgs};
use slotbot_cli::commands::plan::{self, PlanArgs};
use slotbot_cli::commands::{config, doctor};
use slotbot_core::config::AppConfig;
use slotbot_core::domain::slot::SlotType;
use slotbot_core::errors::{AuthenticationError, SessionError};
use slotbot_core::run::PipelineSettings;
use slotbot_core::session::{AuthenticatedSession, SessionGrant, SessionProvider};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALID_ENV: [(&str, &str); 4] = [
    ("SLOTBOT_RETAILER_USERNAME", "shopper@example.com"),
    ("SLOTBOT_RETAILER_PASSWORD", "hunter2"),
    ("SLOTBOT_EMAIL_ENABLED", "false"),
    ("SLOTBOT_CHAT_WEBHOOK_URL", "https://hooks.slack.test/services/T/B/XYZSECRET123"),
];

#[test]
fn check_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = check::run(CheckArgs::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "check");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn check_rejects_missing_explicit_config_file() {
    with_env(&VALID_ENV, || {
        let result = check::run(CheckArgs {
            config_path: Some("does-not-exist/slotbot.toml".into()),
            ..CheckArgs::default()
        });
        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert!(payload["message"].as_str().unwrap_or_default().contains("was not found"));
    });
}

#[test]
fn plan_lists_weekly_windows_without_network() {
    with_env(&VALID_ENV, || {
        let result = plan::run(PlanArgs {
            config_path: None,
            weeks: Some(2),
            date: Some("2020-04-10".parse().expect("date")),
            ..PlanArgs::default()
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "plan");
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["details"],
            json!([
                {
                    "date": "2020-04-10",
                    "slot_type": "fixed_1hr",
                    "location_id": null,
                    "url": "https://www.tesco.com/groceries/en-GB/slots/delivery/2020-04-10?slotGroup=1"
                },
                {
                    "date": "2020-04-17",
                    "slot_type": "fixed_1hr",
                    "location_id": null,
                    "url": "https://www.tesco.com/groceries/en-GB/slots/delivery/2020-04-17?slotGroup=1"
                }
            ])
        );
    });
}

#[test]
fn plan_uses_file_settings_for_slot_type_and_location() {
    with_env(&VALID_ENV, || {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("slotbot.toml");
        fs::write(
            &path,
            "[query]\nlook_ahead_weeks = 1\nslot_type = \"flexi_saver\"\nlocation_id = 77\n",
        )
        .expect("write config");

        let result = plan::run(PlanArgs {
            config_path: Some(path),
            weeks: None,
            date: Some("2020-04-10".parse().expect("date")),
            ..PlanArgs::default()
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(
            payload["details"][0]["url"],
            "https://www.tesco.com/groceries/en-GB/slots/delivery/2020-04-10?slotGroup=4&locationId=77"
        );
    });
}

#[test]
fn plan_runs_without_credentials_or_channels() {
    with_env(&[], || {
        let result = plan::run(PlanArgs {
            weeks: Some(1),
            date: Some("2020-04-10".parse().expect("date")),
            slot_type: Some(SlotType::FlexiSaver),
            location_id: Some(12),
            ..PlanArgs::default()
        });
        assert_eq!(result.exit_code, 0, "output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["details"][0]["slot_type"], "flexi_saver");
        assert_eq!(
            payload["details"][0]["url"],
            "https://www.tesco.com/groceries/en-GB/slots/delivery/2020-04-10?slotGroup=4&locationId=12"
        );
    });
}

#[test]
fn plan_still_rejects_unknown_timezone() {
    with_env(&[("SLOTBOT_NOTIFY_TIMEZONE", "Mars/Olympus_Mons")], || {
        let result = plan::run(PlanArgs::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("notify.timezone"));
    });
}

#[test]
fn config_redacts_secrets_and_attributes_sources() {
    with_env(&VALID_ENV, || {
        let result = config::run(None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains(
            "- retailer.password = <redacted> (source: env (SLOTBOT_RETAILER_PASSWORD))"
        ));
        assert!(message.contains("- query.look_ahead_weeks = 3 (source: default)"));
        assert!(message.contains("chat.webhook_url = https://hooks.slack.test/***"));
        assert!(!message.contains("hunter2"));
        assert!(!message.contains("XYZSECRET123"));
    });
}

#[test]
fn doctor_reports_skipped_checks_when_config_is_invalid() {
    with_env(&[], || {
        let output = doctor::run(None, true);
        let payload = parse_payload(&output);

        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

struct CannedSession {
    body: Value,
}

#[async_trait]
impl AuthenticatedSession for CannedSession {
    async fn issue_authenticated_json(
        &self,
        _url: &str,
        _token: &SecretString,
    ) -> Result<Value, SessionError> {
        Ok(self.body.clone())
    }

    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

enum CannedProvider {
    Slots(Value),
    Rejecting,
}

#[async_trait]
impl SessionProvider for CannedProvider {
    async fn open(&self) -> Result<SessionGrant, AuthenticationError> {
        match self {
            Self::Slots(body) => Ok(SessionGrant::new(
                Box::new(CannedSession { body: body.clone() }),
                "token".to_string().into(),
            )),
            Self::Rejecting => Err(AuthenticationError::Rejected("bad password".to_string())),
        }
    }
}

fn chat_only_config(webhook_url: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.email.enabled = false;
    config.chat.webhook_url = Some(webhook_url.into());
    config.query.look_ahead_weeks = 2;
    config
}

fn one_available_slot() -> Value {
    json!({
        "slots": [
            { "id": "a", "start": "2020-04-10T08:00:00Z", "status": "available" },
            { "id": "b", "start": "2020-04-10T09:00:00Z", "status": "unavailable" }
        ]
    })
}

#[tokio::test]
async fn check_notifies_chat_and_reports_counts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = chat_only_config(format!("{}/hook", server.uri()));
    let settings = PipelineSettings::from_config(&config).expect("settings");
    let provider = Arc::new(CannedProvider::Slots(one_available_slot()));

    let result = check::execute(&config, settings, provider, false).await;
    assert_eq!(result.exit_code, 0, "output: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["available"], 2);
    assert_eq!(payload["details"]["total_queried"], 4);
    assert_eq!(payload["details"]["outcomes"][0]["channel"], "chat");
    assert_eq!(payload["details"]["outcomes"][0]["status"], "sent");
}

#[tokio::test]
async fn check_maps_channel_failure_to_exit_five() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = chat_only_config(format!("{}/hook", server.uri()));
    let settings = PipelineSettings::from_config(&config).expect("settings");
    let provider = Arc::new(CannedProvider::Slots(one_available_slot()));

    let result = check::execute(&config, settings, provider, false).await;
    assert_eq!(result.exit_code, 5);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "notification");
    assert_eq!(payload["details"]["outcomes"][0]["status"], "failed");
}

#[tokio::test]
async fn check_maps_authentication_failure_to_exit_three() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = chat_only_config(format!("{}/hook", server.uri()));
    let settings = PipelineSettings::from_config(&config).expect("settings");

    let provider = Arc::new(CannedProvider::Rejecting);
    let result = check::execute(&config, settings, provider, false).await;
    assert_eq!(result.exit_code, 3);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "authentication");
}

#[tokio::test]
async fn dry_run_prints_message_without_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = chat_only_config(format!("{}/hook", server.uri()));
    let settings = PipelineSettings::from_config(&config).expect("settings");
    let provider = Arc::new(CannedProvider::Slots(one_available_slot()));

    let result = check::execute(&config, settings, provider, true).await;
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let message = payload["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("SlotBot: Slots Available!\nThe following slots were available"));
    assert!(message.contains("Friday, April 10, 9:00 AM"));
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLOTBOT_RETAILER_BASE_URL",
        "SLOTBOT_RETAILER_SLOTS_PATH",
        "SLOTBOT_RETAILER_LOGIN_URL",
        "SLOTBOT_RETAILER_USERNAME",
        "SLOTBOT_RETAILER_PASSWORD",
        "SLOTBOT_RETAILER_REQUEST_TIMEOUT_SECS",
        "SLOTBOT_QUERY_LOOK_AHEAD_WEEKS",
        "SLOTBOT_QUERY_SLOT_TYPE",
        "SLOTBOT_QUERY_LOCATION_ID",
        "SLOTBOT_NOTIFY_MODE",
        "SLOTBOT_NOTIFY_TARGET",
        "SLOTBOT_NOTIFY_TIMEZONE",
        "SLOTBOT_NOTIFY_BOOKING_LINK",
        "SLOTBOT_EMAIL_ENABLED",
        "SLOTBOT_EMAIL_API_KEY",
        "SLOTBOT_EMAIL_API_SECRET",
        "SLOTBOT_EMAIL_FROM_ADDRESS",
        "SLOTBOT_CHAT_WEBHOOK_URL",
        "SLOTBOT_LOGGING_LEVEL",
        "SLOTBOT_LOGGING_FORMAT",
        "SLOTBOT_LOG_LEVEL",
        "SLOTBOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
