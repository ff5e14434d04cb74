use common::{OrderId, OrderStatus};
use thiserror::Error;

/// Names of the uniqueness constraints both store implementations enforce.
///
/// The in-memory store reports the same names PostgreSQL does so callers can
/// match on them without caring which backend is running.
pub mod constraint {
    pub const ACCOUNT_EMAIL: &str = "accounts_email_key";
    pub const RESTAURANT_MANAGER: &str = "restaurants_manager_id_key";
    pub const SESSION_TOKEN: &str = "sessions_pkey";
    pub const AUTH_LINK_CODE: &str = "auth_links_pkey";
    pub const ORDER_ID: &str = "orders_pkey";
    pub const EVALUATION_ORDER: &str = "evaluations_order_id_key";
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional status update found the order in a different status
    /// than the caller expected.
    #[error("Stale state for order {order_id}: expected {expected}, found {actual}")]
    StaleState {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The record addressed by an update does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An insert collided with a uniqueness constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A stored value could not be decoded into a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error is a violation of the named constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
