use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::slot::SlotType;
use crate::notify::NotifyMode;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub retailer: RetailerConfig,
    pub query: QueryConfig,
    pub notify: NotifyConfig,
    pub email: EmailConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct RetailerConfig {
    pub base_url: String,
    pub slots_path: String,
    pub login_url: String,
    pub username: SecretString,
    pub password: SecretString,
    pub username_field: String,
    pub password_field: String,
    pub csrf_selector: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct QueryConfig {
    pub look_ahead_weeks: u32,
    pub slot_type: SlotType,
    pub location_id: Option<u32>,
    pub location_param: String,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub mode: NotifyMode,
    pub target: String,
    pub timezone: String,
    pub booking_link: bool,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub to_name: String,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub webhook_url: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub look_ahead_weeks: Option<u32>,
    pub slot_type: Option<SlotType>,
    pub location_id: Option<u32>,
    pub notify_mode: Option<NotifyMode>,
    pub notify_target: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retailer: RetailerConfig {
                base_url: "https://www.tesco.com".to_string(),
                slots_path: "/groceries/en-GB/slots/delivery".to_string(),
                login_url: "https://secure.tesco.com/account/en-GB/login".to_string(),
                username: String::new().into(),
                password: String::new().into(),
                username_field: "username".to_string(),
                password_field: "password".to_string(),
                csrf_selector: "[name=_csrf]".to_string(),
                request_timeout_secs: 30,
            },
            query: QueryConfig {
                look_ahead_weeks: 3,
                slot_type: SlotType::Fixed1Hr,
                location_id: None,
                location_param: "locationId".to_string(),
            },
            notify: NotifyConfig {
                mode: NotifyMode::Always,
                target: String::new(),
                timezone: "Europe/London".to_string(),
                booking_link: true,
            },
            email: EmailConfig {
                enabled: true,
                api_url: "https://api.mailjet.com/v3.1/send".to_string(),
                api_key: None,
                api_secret: None,
                from_address: None,
                from_name: "SlotBot".to_string(),
                to_name: "SlotBot user".to_string(),
            },
            chat: ChatConfig { webhook_url: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RetailerConfig {
    /// Slots page URL; also the base of every per-day slot query.
    pub fn slots_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.slots_path.trim_start_matches('/')
        )
    }
}

impl NotifyConfig {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.trim().parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "notify.timezone `{}` is not a known IANA timezone (e.g. Europe/London)",
                self.timezone
            ))
        })
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::resolve(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks only what a query plan reads, so credentials and channels may be absent.
    pub fn load_for_planning(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::resolve(options)?;
        config.validate_planning()?;
        Ok(config)
    }

    fn resolve(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("slotbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        Ok(config)
    }

    pub fn email_active(&self) -> bool {
        self.email.enabled
    }

    pub fn chat_active(&self) -> bool {
        self.chat.webhook_url.is_some()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(retailer) = patch.retailer {
            if let Some(base_url) = retailer.base_url {
                self.retailer.base_url = base_url;
            }
            if let Some(slots_path) = retailer.slots_path {
                self.retailer.slots_path = slots_path;
            }
            if let Some(login_url) = retailer.login_url {
                self.retailer.login_url = login_url;
            }
            if let Some(username) = retailer.username {
                self.retailer.username = secret_value(username);
            }
            if let Some(password) = retailer.password {
                self.retailer.password = secret_value(password);
            }
            if let Some(username_field) = retailer.username_field {
                self.retailer.username_field = username_field;
            }
            if let Some(password_field) = retailer.password_field {
                self.retailer.password_field = password_field;
            }
            if let Some(csrf_selector) = retailer.csrf_selector {
                self.retailer.csrf_selector = csrf_selector;
            }
            if let Some(request_timeout_secs) = retailer.request_timeout_secs {
                self.retailer.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(query) = patch.query {
            if let Some(look_ahead_weeks) = query.look_ahead_weeks {
                self.query.look_ahead_weeks = look_ahead_weeks;
            }
            if let Some(slot_type) = query.slot_type {
                self.query.slot_type = slot_type;
            }
            if let Some(location_id) = query.location_id {
                self.query.location_id = Some(location_id);
            }
            if let Some(location_param) = query.location_param {
                self.query.location_param = location_param;
            }
        }

        if let Some(notify) = patch.notify {
            if let Some(mode) = notify.mode {
                self.notify.mode = mode;
            }
            if let Some(target) = notify.target {
                self.notify.target = target;
            }
            if let Some(timezone) = notify.timezone {
                self.notify.timezone = timezone;
            }
            if let Some(booking_link) = notify.booking_link {
                self.notify.booking_link = booking_link;
            }
        }

        if let Some(email) = patch.email {
            if let Some(enabled) = email.enabled {
                self.email.enabled = enabled;
            }
            if let Some(api_url) = email.api_url {
                self.email.api_url = api_url;
            }
            if let Some(api_key) = email.api_key {
                self.email.api_key = Some(secret_value(api_key));
            }
            if let Some(api_secret) = email.api_secret {
                self.email.api_secret = Some(secret_value(api_secret));
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = Some(from_address);
            }
            if let Some(from_name) = email.from_name {
                self.email.from_name = from_name;
            }
            if let Some(to_name) = email.to_name {
                self.email.to_name = to_name;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(webhook_url) = chat.webhook_url {
                self.chat.webhook_url = Some(secret_value(webhook_url));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SLOTBOT_RETAILER_BASE_URL") {
            self.retailer.base_url = value;
        }
        if let Some(value) = read_env("SLOTBOT_RETAILER_SLOTS_PATH") {
            self.retailer.slots_path = value;
        }
        if let Some(value) = read_env("SLOTBOT_RETAILER_LOGIN_URL") {
            self.retailer.login_url = value;
        }
        if let Some(value) = read_env("SLOTBOT_RETAILER_USERNAME") {
            self.retailer.username = secret_value(value);
        }
        if let Some(value) = read_env("SLOTBOT_RETAILER_PASSWORD") {
            self.retailer.password = secret_value(value);
        }
        if let Some(value) = read_env("SLOTBOT_RETAILER_REQUEST_TIMEOUT_SECS") {
            self.retailer.request_timeout_secs =
                parse_u64("SLOTBOT_RETAILER_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SLOTBOT_QUERY_LOOK_AHEAD_WEEKS") {
            self.query.look_ahead_weeks = parse_u32("SLOTBOT_QUERY_LOOK_AHEAD_WEEKS", &value)?;
        }
        if let Some(value) = read_env("SLOTBOT_QUERY_SLOT_TYPE") {
            self.query.slot_type = SlotType::parse(&value).ok_or_else(|| {
                ConfigError::InvalidEnvOverride {
                    key: "SLOTBOT_QUERY_SLOT_TYPE".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("SLOTBOT_QUERY_LOCATION_ID") {
            self.query.location_id = Some(parse_u32("SLOTBOT_QUERY_LOCATION_ID", &value)?);
        }

        if let Some(value) = read_env("SLOTBOT_NOTIFY_MODE") {
            self.notify.mode =
                NotifyMode::parse(&value).ok_or_else(|| ConfigError::InvalidEnvOverride {
                    key: "SLOTBOT_NOTIFY_MODE".to_string(),
                    value: value.clone(),
                })?;
        }
        if let Some(value) = read_env("SLOTBOT_NOTIFY_TARGET") {
            self.notify.target = value;
        }
        if let Some(value) = read_env("SLOTBOT_NOTIFY_TIMEZONE") {
            self.notify.timezone = value;
        }
        if let Some(value) = read_env("SLOTBOT_NOTIFY_BOOKING_LINK") {
            self.notify.booking_link = parse_bool("SLOTBOT_NOTIFY_BOOKING_LINK", &value)?;
        }

        if let Some(value) = read_env("SLOTBOT_EMAIL_ENABLED") {
            self.email.enabled = parse_bool("SLOTBOT_EMAIL_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SLOTBOT_EMAIL_API_KEY") {
            self.email.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SLOTBOT_EMAIL_API_SECRET") {
            self.email.api_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("SLOTBOT_EMAIL_FROM_ADDRESS") {
            self.email.from_address = Some(value);
        }

        if let Some(value) = read_env("SLOTBOT_CHAT_WEBHOOK_URL") {
            self.chat.webhook_url = Some(secret_value(value));
        }

        let log_level =
            read_env("SLOTBOT_LOGGING_LEVEL").or_else(|| read_env("SLOTBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SLOTBOT_LOGGING_FORMAT").or_else(|| read_env("SLOTBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(look_ahead_weeks) = overrides.look_ahead_weeks {
            self.query.look_ahead_weeks = look_ahead_weeks;
        }
        if let Some(slot_type) = overrides.slot_type {
            self.query.slot_type = slot_type;
        }
        if let Some(location_id) = overrides.location_id {
            self.query.location_id = Some(location_id);
        }
        if let Some(mode) = overrides.notify_mode {
            self.notify.mode = mode;
        }
        if let Some(target) = overrides.notify_target {
            self.notify.target = target;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_retailer(&self.retailer)?;
        validate_query(&self.query)?;
        validate_notify(&self.notify, self.email.enabled)?;
        validate_email(&self.email)?;
        validate_chat(&self.chat)?;
        if !self.email_active() && !self.chat_active() {
            return Err(ConfigError::Validation(
                "no notification channel is configured: enable email or set chat.webhook_url"
                    .to_string(),
            ));
        }
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn validate_planning(&self) -> Result<(), ConfigError> {
        validate_retailer_urls(&self.retailer)?;
        validate_query(&self.query)?;
        self.notify.timezone()?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("slotbot.toml"), PathBuf::from("config/slotbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_retailer_urls(retailer: &RetailerConfig) -> Result<(), ConfigError> {
    let urls =
        [("retailer.base_url", &retailer.base_url), ("retailer.login_url", &retailer.login_url)];
    for (key, value) in urls {
        if !is_http_url(value.trim()) {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }
    Ok(())
}

fn validate_retailer(retailer: &RetailerConfig) -> Result<(), ConfigError> {
    validate_retailer_urls(retailer)?;

    if retailer.username.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "retailer.username is required. Set SLOTBOT_RETAILER_USERNAME to the account login"
                .to_string(),
        ));
    }
    if retailer.password.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "retailer.password is required. Set SLOTBOT_RETAILER_PASSWORD".to_string(),
        ));
    }

    if retailer.username_field.trim().is_empty() || retailer.password_field.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retailer.username_field and retailer.password_field must not be empty".to_string(),
        ));
    }

    if retailer.csrf_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retailer.csrf_selector must not be empty".to_string(),
        ));
    }

    if retailer.request_timeout_secs == 0 || retailer.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "retailer.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_query(query: &QueryConfig) -> Result<(), ConfigError> {
    if query.look_ahead_weeks == 0 || query.look_ahead_weeks > 12 {
        return Err(ConfigError::Validation(
            "query.look_ahead_weeks must be in range 1..=12".to_string(),
        ));
    }

    let param = query.location_param.trim();
    let valid_param = !param.is_empty()
        && param.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !valid_param {
        return Err(ConfigError::Validation(
            "query.location_param must be a non-empty identifier ([A-Za-z0-9_-])".to_string(),
        ));
    }

    Ok(())
}

fn validate_notify(notify: &NotifyConfig, email_enabled: bool) -> Result<(), ConfigError> {
    notify.timezone()?;

    if email_enabled {
        let target = notify.target.trim();
        let looks_like_address = target
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !looks_like_address {
            return Err(ConfigError::Validation(
                "notify.target must be an e-mail address when email is enabled. Set SLOTBOT_NOTIFY_TARGET"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if !email.enabled {
        return Ok(());
    }

    if !is_http_url(email.api_url.trim()) {
        return Err(ConfigError::Validation(
            "email.api_url must start with http:// or https://".to_string(),
        ));
    }

    let missing = |value: &Option<SecretString>| {
        value.as_ref().map(|secret| secret.expose_secret().trim().is_empty()).unwrap_or(true)
    };
    if missing(&email.api_key) || missing(&email.api_secret) {
        return Err(ConfigError::Validation(
            "email.api_key and email.api_secret are required when email is enabled. Get them from https://app.mailjet.com/account/apikeys"
                .to_string(),
        ));
    }

    let from_missing =
        email.from_address.as_ref().map(|value| !value.contains('@')).unwrap_or(true);
    if from_missing {
        return Err(ConfigError::Validation(
            "email.from_address must be a verified sender address when email is enabled"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if let Some(webhook_url) = &chat.webhook_url {
        if !is_http_url(webhook_url.expose_secret().trim()) {
            return Err(ConfigError::Validation(
                "chat.webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    retailer: Option<RetailerPatch>,
    query: Option<QueryPatch>,
    notify: Option<NotifyPatch>,
    email: Option<EmailPatch>,
    chat: Option<ChatPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RetailerPatch {
    base_url: Option<String>,
    slots_path: Option<String>,
    login_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    username_field: Option<String>,
    password_field: Option<String>,
    csrf_selector: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryPatch {
    look_ahead_weeks: Option<u32>,
    slot_type: Option<SlotType>,
    location_id: Option<u32>,
    location_param: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyPatch {
    mode: Option<NotifyMode>,
    target: Option<String>,
    timezone: Option<String>,
    booking_link: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    from_address: Option<String>,
    from_name: Option<String>,
    to_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
