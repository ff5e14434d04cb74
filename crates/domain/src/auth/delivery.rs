//! Outbound delivery of authentication links.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AccountId;
use thiserror::Error;

/// A link ready to be sent to a customer.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthLinkMessage {
    pub account_id: AccountId,
    pub email: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthLinkMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthLinkMessage")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl AuthLinkMessage {
    /// Extracts the `code` query parameter from the link.
    pub fn code(&self) -> Option<String> {
        let url = url::Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug, Error)]
#[error("Link delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Trait for delivering authentication links (email, SMS, ...).
#[async_trait]
pub trait LinkSender: Send + Sync {
    async fn send(&self, message: &AuthLinkMessage) -> Result<(), DeliveryError>;
}

/// Writes links to the log. For local development only.
#[derive(Debug, Clone, Default)]
pub struct LogLinkSender;

#[async_trait]
impl LinkSender for LogLinkSender {
    async fn send(&self, message: &AuthLinkMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            email = %message.email,
            url = %message.url,
            expires_at = %message.expires_at,
            "Authentication link ready"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemorySenderState {
    sent: Vec<AuthLinkMessage>,
    fail_on_send: bool,
}

/// Records sent links in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLinkSender {
    state: Arc<Mutex<InMemorySenderState>>,
}

impl InMemoryLinkSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemorySenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the sender to fail every subsequent send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state().fail_on_send = fail;
    }

    /// Returns every message sent so far.
    pub fn sent(&self) -> Vec<AuthLinkMessage> {
        self.state().sent.clone()
    }

    /// Returns the code of the most recent link sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.state()
            .sent
            .iter()
            .rev()
            .find(|m| m.email == email)
            .and_then(AuthLinkMessage::code)
    }
}

#[async_trait]
impl LinkSender for InMemoryLinkSender {
    async fn send(&self, message: &AuthLinkMessage) -> Result<(), DeliveryError> {
        let mut state = self.state();
        if state.fail_on_send {
            return Err(DeliveryError("mailbox unavailable".to_string()));
        }
        state.sent.push(message.clone());
        Ok(())
    }
}
