use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use slotbot_core::config::RetailerConfig;
use slotbot_core::errors::{AuthenticationError, SessionError};
use slotbot_core::session::{AuthenticatedSession, SessionGrant, SessionProvider};
use tracing::{debug, info};

use crate::form::{extract_token, parse_login_form, shows_login_form};

pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Clone, Debug)]
pub struct HttpSessionSettings {
    pub login_url: String,
    pub slots_url: String,
    pub username: SecretString,
    pub password: SecretString,
    pub username_field: String,
    pub password_field: String,
    pub csrf_selector: String,
    pub request_timeout: Duration,
}

impl From<&RetailerConfig> for HttpSessionSettings {
    fn from(config: &RetailerConfig) -> Self {
        Self {
            login_url: config.login_url.clone(),
            slots_url: config.slots_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            username_field: config.username_field.clone(),
            password_field: config.password_field.clone(),
            csrf_selector: config.csrf_selector.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Logs in with a plain cookie-carrying HTTP client and scrapes the CSRF token from the
/// slots page.
#[derive(Clone, Debug)]
pub struct HttpSessionProvider {
    settings: HttpSessionSettings,
}

impl HttpSessionProvider {
    pub fn new(settings: HttpSessionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HttpSessionSettings {
        &self.settings
    }

    fn client(&self) -> Result<Client, AuthenticationError> {
        Client::builder()
            .cookie_store(true)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|error| AuthenticationError::Unreachable(error.to_string()))
    }

    async fn fetch_page(
        client: &Client,
        url: &str,
    ) -> Result<(Url, String), AuthenticationError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|error| AuthenticationError::Unreachable(format!("{url}: {error}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthenticationError::Unreachable(format!("{url} returned {status}")));
        }
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|error| AuthenticationError::Unreachable(format!("{url}: {error}")))?;
        Ok((final_url, body))
    }

    async fn log_in(&self, client: &Client) -> Result<(), AuthenticationError> {
        let settings = &self.settings;
        let (page_url, page) = Self::fetch_page(client, &settings.login_url).await?;

        let form = parse_login_form(&page, &settings.username_field, &settings.password_field)
            .map_err(|error| AuthenticationError::Rejected(error.to_string()))?;
        let action = match form.action.as_deref() {
            Some(action) => page_url.join(action).map_err(|error| {
                AuthenticationError::Rejected(format!("login form action `{action}`: {error}"))
            })?,
            None => page_url,
        };
        let fields = form.fields(
            settings.username.expose_secret(),
            settings.password.expose_secret(),
        );
        debug!(action = %action, fields = fields.len(), "submitting login form");

        let response = client
            .post(action.clone())
            .form(&fields)
            .send()
            .await
            .map_err(|error| AuthenticationError::Unreachable(format!("{action}: {error}")))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthenticationError::Rejected(format!("login returned {status}")));
        }
        if !status.is_success() {
            return Err(AuthenticationError::Unreachable(format!("login returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|error| AuthenticationError::Unreachable(error.to_string()))?;
        if shows_login_form(&body, &settings.password_field) {
            return Err(AuthenticationError::Rejected(
                "login form was shown again; check the account credentials".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn open(&self) -> Result<SessionGrant, AuthenticationError> {
        let client = self.client()?;
        self.log_in(&client).await?;

        let (_, slots_page) = Self::fetch_page(&client, &self.settings.slots_url).await?;
        let selector = &self.settings.csrf_selector;
        let token = extract_token(&slots_page, selector)
            .map_err(|error| AuthenticationError::Rejected(error.to_string()))?
            .ok_or_else(|| AuthenticationError::TokenMissing { selector: selector.clone() })?;

        info!(slots_url = %self.settings.slots_url, "logged in and read csrf token");
        let session = HttpSession { client, closed: AtomicBool::new(false) };
        Ok(SessionGrant::new(Box::new(session), SecretString::from(token)))
    }
}

/// Cookie jar and connection pool of a logged-in client.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    closed: AtomicBool,
}

#[async_trait]
impl AuthenticatedSession for HttpSession {
    async fn issue_authenticated_json(
        &self,
        url: &str,
        token: &SecretString,
    ) -> Result<Value, SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Transport("session is closed".to_string()));
        }

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(CSRF_HEADER, token.expose_secret())
            .send()
            .await
            .map_err(|error| SessionError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status { status: status.as_u16(), url: url.to_string() });
        }

        response.json::<Value>().await.map_err(|error| SessionError::Decode(error.to_string()))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
