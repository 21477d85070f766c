//! Scripted fakes for the session and channel seams.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{Barrier, Mutex};

use crate::errors::{AuthenticationError, NotificationError, SessionError};
use crate::notify::{ChannelKind, NotificationChannel, NotificationMessage};
use crate::session::{AuthenticatedSession, SessionGrant, SessionProvider};

#[derive(Default)]
struct SessionState {
    requests: Vec<(String, String)>,
    close_calls: usize,
}

#[derive(Clone, Default)]
pub struct SessionRecorder {
    state: Arc<Mutex<SessionState>>,
}

impl SessionRecorder {
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.state.lock().await.requests.clone()
    }

    pub async fn close_calls(&self) -> usize {
        self.state.lock().await.close_calls
    }
}

#[derive(Default)]
pub struct ScriptedSession {
    responses: HashMap<String, Result<Value, SessionError>>,
    recorder: SessionRecorder,
}

impl ScriptedSession {
    pub fn respond(mut self, url: &str, response: Result<Value, SessionError>) -> Self {
        self.responses.insert(url.to_owned(), response);
        self
    }

    pub fn recorder(&self) -> SessionRecorder {
        self.recorder.clone()
    }

    pub fn into_grant(self, token: &str) -> SessionGrant {
        SessionGrant::new(Box::new(self), SecretString::from(token.to_owned()))
    }
}

#[async_trait]
impl AuthenticatedSession for ScriptedSession {
    async fn issue_authenticated_json(
        &self,
        url: &str,
        token: &SecretString,
    ) -> Result<Value, SessionError> {
        let mut state = self.recorder.state.lock().await;
        state.requests.push((url.to_owned(), token.expose_secret().to_owned()));
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(SessionError::Status { status: 404, url: url.to_owned() }))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.recorder.state.lock().await.close_calls += 1;
        Ok(())
    }
}

/// Hands out one pre-built session, or fails authentication.
pub struct ScriptedProvider {
    session: Mutex<Option<Result<ScriptedSession, AuthenticationError>>>,
    token: String,
}

impl ScriptedProvider {
    pub fn new(session: ScriptedSession) -> Self {
        Self { session: Mutex::new(Some(Ok(session))), token: "csrf-token".to_owned() }
    }

    pub fn failing(error: AuthenticationError) -> Self {
        Self { session: Mutex::new(Some(Err(error))), token: String::new() }
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn open(&self) -> Result<SessionGrant, AuthenticationError> {
        let scripted = self
            .session
            .lock()
            .await
            .take()
            .unwrap_or_else(|| {
                Err(AuthenticationError::Rejected("session already used".to_owned()))
            })?;
        Ok(scripted.into_grant(&self.token))
    }
}

pub struct RecordingChannel {
    kind: ChannelKind,
    results: Mutex<VecDeque<Result<(), NotificationError>>>,
    sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingChannel {
    pub fn succeeding(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self { kind, results: Mutex::default(), sent: Mutex::default() })
    }

    pub fn failing(kind: ChannelKind, error: NotificationError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            results: Mutex::new(VecDeque::from(vec![Err(error)])),
            sent: Mutex::default(),
        })
    }

    pub async fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        self.sent.lock().await.push(message.clone());
        self.results.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

/// Succeeds only once every channel sharing the barrier has started sending.
pub struct RendezvousChannel {
    kind: ChannelKind,
    barrier: Arc<Barrier>,
}

impl RendezvousChannel {
    pub fn new(kind: ChannelKind, barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(Self { kind, barrier })
    }
}

#[async_trait]
impl NotificationChannel for RendezvousChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, _message: &NotificationMessage) -> Result<(), NotificationError> {
        self.barrier.wait().await;
        Ok(())
    }
}
