//! Password sessions for managers and session validation for everyone.

use std::time::Duration;

use chrono::Utc;
use common::{AccountId, Role};
use store::{Account, Session, Store};

use super::{IssuedSession, PasswordHasher, normalize_email, token};
use crate::{Actor, AuthSettings, DomainError, deadline::within};

/// Issues, validates and revokes sessions.
///
/// The durable session table is the only source of truth; nothing is cached
/// in-process, so sign-out takes effect immediately on every instance.
#[derive(Clone)]
pub struct SessionAuthenticator<S> {
    store: S,
    hasher: PasswordHasher,
    session_ttl: chrono::Duration,
    timeout: Duration,
}

impl<S: Store + Clone> SessionAuthenticator<S> {
    pub fn new(store: S, settings: &AuthSettings, timeout: Duration) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(settings.password_iterations),
            session_ttl: settings.session_ttl,
            timeout,
        }
    }

    /// The hasher used for manager passwords.
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Signs a manager in with email and password.
    ///
    /// Unknown emails, customer accounts and wrong passwords all fail with
    /// the same `InvalidCredentials` after the same amount of hashing work.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, DomainError> {
        let email = normalize_email(email);
        let account = within(
            self.timeout,
            "accounts.find_by_email",
            self.store.find_account_by_email(&email),
        )
        .await?;

        let verified = self
            .hasher
            .verify_blocking(password, account.as_ref().and_then(Account::password_hash))
            .await?;

        match account {
            Some(account) if verified => self.issue(account.id, "password").await,
            _ => {
                tracing::warn!("Rejected password login");
                Err(DomainError::InvalidCredentials)
            }
        }
    }

    /// Creates and persists a new session for `account_id`.
    pub(crate) async fn issue(
        &self,
        account_id: AccountId,
        method: &'static str,
    ) -> Result<IssuedSession, DomainError> {
        let token = token::generate();
        let issued_at = Utc::now();
        let session = Session {
            token_hash: token::digest(&token),
            account_id,
            issued_at,
            expires_at: issued_at + self.session_ttl,
            revoked_at: None,
        };
        let expires_at = session.expires_at;

        within(
            self.timeout,
            "sessions.insert",
            self.store.insert_session(session),
        )
        .await?;

        metrics::counter!("sessions_issued_total", "method" => method).increment(1);
        tracing::info!(%account_id, method, "Session issued");

        Ok(IssuedSession {
            token,
            account_id,
            expires_at,
        })
    }

    /// Resolves a bearer token to its account.
    pub async fn validate(&self, token: &str) -> Result<Account, DomainError> {
        if !token::is_well_formed(token) {
            return Err(DomainError::Unauthenticated);
        }

        let session = within(
            self.timeout,
            "sessions.get",
            self.store.get_session(&token::digest(token)),
        )
        .await?
        .filter(|s| s.is_active(Utc::now()))
        .ok_or(DomainError::Unauthenticated)?;

        within(
            self.timeout,
            "accounts.get",
            self.store.get_account(session.account_id),
        )
        .await?
        .ok_or(DomainError::Unauthenticated)
    }

    /// Resolves a bearer token to an [`Actor`], including the restaurant a
    /// manager runs.
    pub async fn authenticate(&self, token: &str) -> Result<Actor, DomainError> {
        let account = self.validate(token).await?;
        self.actor_for(&account).await
    }

    pub(crate) async fn actor_for(&self, account: &Account) -> Result<Actor, DomainError> {
        match account.role() {
            Role::Customer => Ok(Actor::Customer {
                account_id: account.id,
            }),
            Role::Manager => {
                let restaurant = within(
                    self.timeout,
                    "restaurants.find_by_manager",
                    self.store.find_restaurant_by_manager(account.id),
                )
                .await?
                .ok_or_else(|| {
                    // Registration creates both together
                    DomainError::Store(store::StoreError::Corrupt(format!(
                        "manager {} has no restaurant",
                        account.id
                    )))
                })?;
                Ok(Actor::Manager {
                    account_id: account.id,
                    restaurant_id: restaurant.id,
                })
            }
        }
    }

    /// Revokes the session behind `token`.
    ///
    /// Succeeds for unknown, malformed and already-revoked tokens alike.
    pub async fn sign_out(&self, token: &str) -> Result<(), DomainError> {
        if !token::is_well_formed(token) {
            return Ok(());
        }

        let revoked = within(
            self.timeout,
            "sessions.revoke",
            self.store
                .revoke_session(&token::digest(token), Utc::now()),
        )
        .await?;

        if revoked {
            tracing::info!("Session revoked");
        }
        Ok(())
    }
}
