//! Passwordless sign-in for customers through single-use links.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::Role;
use store::{Account, AuthLink, Store};
use url::Url;

use super::{AuthLinkMessage, IssuedSession, LinkSender, SessionAuthenticator, normalize_email, token};
use crate::{AuthSettings, DomainError, deadline::within};

pub struct AuthLinkIssuer<S> {
    store: S,
    sessions: SessionAuthenticator<S>,
    sender: Arc<dyn LinkSender>,
    link_ttl: chrono::Duration,
    link_base_url: String,
    redirect_url: String,
    timeout: Duration,
}

impl<S: Clone> Clone for AuthLinkIssuer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sessions: self.sessions.clone(),
            sender: Arc::clone(&self.sender),
            link_ttl: self.link_ttl,
            link_base_url: self.link_base_url.clone(),
            redirect_url: self.redirect_url.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: Store + Clone> AuthLinkIssuer<S> {
    pub fn new(
        store: S,
        sessions: SessionAuthenticator<S>,
        sender: Arc<dyn LinkSender>,
        settings: &AuthSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            sender,
            link_ttl: settings.link_ttl,
            link_base_url: settings.link_base_url.clone(),
            redirect_url: settings.redirect_url.clone(),
            timeout,
        }
    }

    /// Requests a sign-in link for `email`.
    ///
    /// Returns `Ok(())` whether or not a customer with that email exists.
    /// Only a failing account lookup is reported; issuance and delivery
    /// failures are logged and swallowed.
    #[tracing::instrument(skip(self))]
    pub async fn request_link(&self, email: &str) -> Result<(), DomainError> {
        let email = normalize_email(email);
        let account = within(
            self.timeout,
            "accounts.find_by_email",
            self.store.find_account_by_email(&email),
        )
        .await?;

        match account {
            Some(account) if account.role() == Role::Customer => match self.issue(&account).await {
                Ok(message) => self.deliver(&message).await,
                Err(e) => {
                    tracing::warn!(account_id = %account.id, error = %e, "Authentication link not issued");
                }
            },
            _ => tracing::debug!("No customer for authentication link request"),
        }
        Ok(())
    }

    async fn issue(&self, account: &Account) -> Result<AuthLinkMessage, DomainError> {
        let code = token::generate();
        let issued_at = Utc::now();
        let link = AuthLink {
            code_hash: token::digest(&code),
            account_id: account.id,
            issued_at,
            expires_at: issued_at + self.link_ttl,
            consumed_at: None,
        };
        let expires_at = link.expires_at;

        let url = Url::parse_with_params(
            &self.link_base_url,
            &[("code", code.as_str()), ("redirect", self.redirect_url.as_str())],
        )
        .map_err(|e| DomainError::invalid(format!("link base URL: {e}")))?;

        within(self.timeout, "auth_links.insert", self.store.insert_link(link)).await?;
        metrics::counter!("auth_links_issued_total").increment(1);

        Ok(AuthLinkMessage {
            account_id: account.id,
            email: account.email.clone(),
            url: url.into(),
            expires_at,
        })
    }

    async fn deliver(&self, message: &AuthLinkMessage) {
        match tokio::time::timeout(self.timeout, self.sender.send(message)).await {
            Ok(Ok(())) => tracing::info!(account_id = %message.account_id, "Authentication link sent"),
            Ok(Err(e)) => {
                tracing::warn!(account_id = %message.account_id, error = %e, "Authentication link not delivered");
            }
            Err(_) => {
                tracing::warn!(account_id = %message.account_id, "Authentication link delivery timed out");
            }
        }
    }

    /// Exchanges a link code for a session.
    ///
    /// The code is consumed by one atomic store operation, so of any number
    /// of concurrent attempts at most one gets a session.
    #[tracing::instrument(skip(self, code))]
    pub async fn consume(&self, code: &str) -> Result<IssuedSession, DomainError> {
        if !token::is_well_formed(code) {
            metrics::counter!("auth_links_consumed_total", "outcome" => "rejected").increment(1);
            return Err(DomainError::InvalidOrExpiredLink);
        }

        let consumed = within(
            self.timeout,
            "auth_links.consume",
            self.store.consume_link(&token::digest(code), Utc::now()),
        )
        .await?;

        let Some(link) = consumed else {
            metrics::counter!("auth_links_consumed_total", "outcome" => "rejected").increment(1);
            tracing::warn!("Rejected authentication link");
            return Err(DomainError::InvalidOrExpiredLink);
        };

        metrics::counter!("auth_links_consumed_total", "outcome" => "accepted").increment(1);
        self.sessions.issue(link.account_id, "link").await
    }
}
