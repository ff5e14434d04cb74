//! Domain error types.

use common::{OrderId, OrderStatus};
use store::{StoreError, constraint};
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// Every variant except [`DomainError::Store`] and [`DomainError::Internal`]
/// is a business outcome the caller is expected to act on. Those two are
/// internal faults and should be reported generically.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session, or the session is malformed, expired or revoked.
    #[error("Authentication required")]
    Unauthenticated,

    /// Email and password did not identify a manager.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but the caller's role or ownership does not allow it.
    #[error("Not allowed to {action}")]
    Forbidden { action: &'static str },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order is not in a status the requested action starts from.
    #[error("Cannot {action} an order that is {current}")]
    InvalidTransition {
        action: &'static str,
        current: OrderStatus,
    },

    /// Another writer changed the order between the check and the commit.
    #[error("Order {order_id} was modified concurrently: expected {expected}, found {actual}")]
    Conflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Authentication link is invalid or expired")]
    InvalidOrExpiredLink,

    /// A uniqueness rule rejected the write.
    #[error("{what} already exists")]
    AlreadyExists { what: &'static str },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A store call or link delivery did not finish in time.
    #[error("Timed out during {operation}")]
    Timeout { operation: &'static str },

    /// An unexpected persistence fault.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Background work died before producing a result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }

    /// Returns true if this is an internal fault rather than a business
    /// outcome.
    pub fn is_internal(&self) -> bool {
        matches!(self, DomainError::Store(_) | DomainError::Internal(_))
    }

    /// Returns true if the caller may safely re-read state and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Conflict { .. } | DomainError::Timeout { .. }
        )
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StaleState {
                order_id,
                expected,
                actual,
            } => DomainError::Conflict {
                order_id,
                expected,
                actual,
            },
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::UniqueViolation { constraint } => {
                let what = match constraint.as_str() {
                    constraint::ACCOUNT_EMAIL => Some("An account with this email"),
                    constraint::RESTAURANT_MANAGER => Some("A restaurant for this manager"),
                    constraint::EVALUATION_ORDER => Some("An evaluation for this order"),
                    // Random token and id collisions are not caller mistakes
                    _ => None,
                };
                match what {
                    Some(what) => DomainError::AlreadyExists { what },
                    None => DomainError::Store(StoreError::UniqueViolation { constraint }),
                }
            }
            other => DomainError::Store(other),
        }
    }
}
