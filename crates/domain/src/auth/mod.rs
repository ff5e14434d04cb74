//! Authentication: password sessions, single-use links and the tokens
//! behind both.

mod delivery;
mod link;
mod password;
mod session;
pub mod token;

use chrono::{DateTime, Utc};
use common::AccountId;

pub use delivery::{
    AuthLinkMessage, DeliveryError, InMemoryLinkSender, LinkSender, LogLinkSender,
};
pub use link::AuthLinkIssuer;
pub use password::PasswordHasher;
pub use session::SessionAuthenticator;

/// A freshly issued session. `token` is the bearer credential and is shown
/// to the caller exactly once.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("account_id", &self.account_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Emails are compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
