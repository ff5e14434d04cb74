//! Persisted records.
//!
//! These are plain data: the rules about who may create or change them live
//! in the domain crate.

use chrono::{DateTime, Utc};
use common::{AccountId, EvaluationId, Money, OrderId, OrderStatus, ProductId, RestaurantId, Role};
use serde::{Deserialize, Serialize};

/// How an account proves its identity.
///
/// The variant fixes the account's role: managers hold a password hash,
/// customers hold nothing and sign in through authentication links.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Salted password hash in the format produced by the domain's hasher.
    Password { hash: String },
    Passwordless,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Password { .. } => f.write_str("Password { hash: <redacted> }"),
            Credential::Passwordless => f.write_str("Passwordless"),
        }
    }
}

/// A manager or customer account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Trimmed and lower-cased; unique across all accounts.
    pub email: String,
    pub phone: Option<String>,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns the role implied by the account's credential.
    pub fn role(&self) -> Role {
        match self.credential {
            Credential::Password { .. } => Role::Manager,
            Credential::Passwordless => Role::Customer,
        }
    }

    /// Returns the stored password hash, if this is a manager account.
    pub fn password_hash(&self) -> Option<&str> {
        match &self.credential {
            Credential::Password { hash } => Some(hash),
            Credential::Passwordless => None,
        }
    }
}

/// A server-side session, keyed by the SHA-256 digest of its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_hash: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session is usable while unexpired and not revoked.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// A single-use authentication link, keyed by the digest of its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLink {
    pub code_hash: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl AuthLink {
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && now < self.expires_at
    }
}

/// A restaurant and its profile. Owned by exactly one manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: AccountId,
    pub created_at: DateTime<Utc>,
}

/// A product on a restaurant's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

/// Replacement values for an existing product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpdate {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

/// A batch of menu edits applied atomically to one restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuChanges {
    pub create: Vec<Product>,
    pub update: Vec<ProductUpdate>,
    pub delete: Vec<ProductId>,
}

impl MenuChanges {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// A line item copied from the menu when the order was placed.
///
/// Later menu edits never touch it, so historical receipts stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total price for this line (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Like [`total_price`](Self::total_price), but `None` when the amount
    /// does not fit in cents.
    pub fn checked_total_price(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// An order and the time of every transition it went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: AccountId,
    /// The customer's name when the order was placed.
    pub customer_name: String,
    pub restaurant_id: RestaurantId,
    pub items: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns when the order entered `status`, if it ever did.
    pub fn entered_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match status {
            OrderStatus::Pending => Some(self.placed_at),
            OrderStatus::Approved => self.approved_at,
            OrderStatus::Dispatched => self.dispatched_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
        }
    }

    /// Moves the order to `status` and stamps the matching timestamp.
    ///
    /// Stores call this only after the expected-status check has passed.
    pub fn record_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        match status {
            OrderStatus::Pending => self.placed_at = at,
            OrderStatus::Approved => self.approved_at = Some(at),
            OrderStatus::Dispatched => self.dispatched_at = Some(at),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
        }
    }
}

/// A rating left by a customer on one of their delivered orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub customer_id: AccountId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(credential: Credential) -> Account {
        Account {
            id: AccountId::new(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            credential,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_follows_credential() {
        let manager = account(Credential::Password {
            hash: "pbkdf2-sha256$1$00$00".to_string(),
        });
        assert_eq!(manager.role(), Role::Manager);
        assert!(manager.password_hash().is_some());

        let customer = account(Credential::Passwordless);
        assert_eq!(customer.role(), Role::Customer);
        assert!(customer.password_hash().is_none());
    }

    #[test]
    fn credential_debug_redacts_hash() {
        let rendered = format!(
            "{:?}",
            Credential::Password {
                hash: "secret-digest".to_string()
            }
        );
        assert!(!rendered.contains("secret-digest"));
    }

    #[test]
    fn session_activity() {
        let now = Utc::now();
        let mut session = Session {
            token_hash: "h".to_string(),
            account_id: AccountId::new(),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
            revoked_at: None,
        };
        assert!(session.is_active(now));
        assert!(!session.is_active(now + chrono::Duration::hours(2)));

        session.revoked_at = Some(now);
        assert!(!session.is_active(now));
    }

    #[test]
    fn record_status_stamps_matching_timestamp() {
        let now = Utc::now();
        let mut order = Order {
            id: OrderId::new(),
            customer_id: AccountId::new(),
            customer_name: "Ada".to_string(),
            restaurant_id: RestaurantId::new(),
            items: vec![],
            total: Money::zero(),
            status: OrderStatus::Pending,
            placed_at: now,
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
        };

        let later = now + chrono::Duration::minutes(5);
        order.record_status(OrderStatus::Approved, later);

        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.entered_at(OrderStatus::Approved), Some(later));
        assert_eq!(order.entered_at(OrderStatus::Pending), Some(now));
        assert_eq!(order.entered_at(OrderStatus::Cancelled), None);
    }
}
