use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, OrderStatus, RestaurantId};

use crate::{
    Account, AuthLink, Evaluation, MenuChanges, Order, OrderQuery, Page, PageRequest, Product,
    Restaurant, Result, Session,
};

/// Account records (the identity store).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account.
    ///
    /// Fails with `UniqueViolation(accounts_email_key)` if the email is taken.
    async fn insert_account(&self, account: Account) -> Result<()>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Looks an account up by its normalized email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;
}

/// Server-side sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> Result<()>;

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Marks a session revoked.
    ///
    /// Returns false if the session was unknown or already revoked.
    async fn revoke_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool>;
}

/// Single-use authentication links.
#[async_trait]
pub trait AuthLinkStore: Send + Sync {
    async fn insert_link(&self, link: AuthLink) -> Result<()>;

    /// Atomically consumes a link.
    ///
    /// The link is marked consumed only if it exists, has not been consumed,
    /// and has not expired at `now`. Exactly one of any number of concurrent
    /// callers receives `Some`; every other caller receives `None`.
    async fn consume_link(&self, code_hash: &str, now: DateTime<Utc>) -> Result<Option<AuthLink>>;
}

/// Restaurants and their menus.
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    /// Creates a manager account and its restaurant in one atomic step.
    async fn register_restaurant(&self, manager: Account, restaurant: Restaurant) -> Result<()>;

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>>;

    async fn find_restaurant_by_manager(&self, manager_id: AccountId)
    -> Result<Option<Restaurant>>;

    async fn update_restaurant_profile(
        &self,
        id: RestaurantId,
        name: String,
        description: Option<String>,
    ) -> Result<Restaurant>;

    /// Lists a restaurant's products ordered by name.
    async fn list_products(&self, restaurant_id: RestaurantId) -> Result<Vec<Product>>;

    /// Applies menu edits atomically and returns the resulting menu.
    ///
    /// Fails with `NotFound` (and applies nothing) if an updated or deleted
    /// product does not belong to `restaurant_id`.
    async fn apply_menu_changes(
        &self,
        restaurant_id: RestaurantId,
        changes: MenuChanges,
    ) -> Result<Vec<Product>>;
}

/// Order records with optimistic-concurrency status updates.
///
/// No business rules live here; the lifecycle engine decides which
/// transitions are legal and who may request them.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: Order) -> Result<()>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Moves an order from `expected` to `next`, stamping `at`.
    ///
    /// Succeeds only if the stored status equals `expected` at the moment
    /// of the write; otherwise fails with `StaleState` carrying the actual
    /// status. Fails with `NotFound` for unknown orders.
    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order>;

    /// Lists a customer's orders, newest first.
    async fn list_for_customer(
        &self,
        customer_id: AccountId,
        query: &OrderQuery,
    ) -> Result<Page<Order>>;

    /// Lists a restaurant's orders, newest first.
    async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        query: &OrderQuery,
    ) -> Result<Page<Order>>;

    /// Returns every order of a restaurant placed in `[from, to)`.
    async fn restaurant_orders_placed_between(
        &self,
        restaurant_id: RestaurantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>>;
}

/// Evaluations, unique per order.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Inserts an evaluation.
    ///
    /// Fails with `UniqueViolation(evaluations_order_id_key)` if the order
    /// already has one, regardless of how close together the calls were.
    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<()>;

    /// Lists a restaurant's evaluations, newest first.
    async fn list_restaurant_evaluations(
        &self,
        restaurant_id: RestaurantId,
        page: PageRequest,
    ) -> Result<Page<Evaluation>>;
}

/// Everything the domain services need from persistence.
pub trait Store:
    AccountStore + SessionStore + AuthLinkStore + RestaurantStore + OrderRepository + EvaluationStore
{
}

// Blanket implementation for anything that implements every repository
impl<T> Store for T where
    T: AccountStore
        + SessionStore
        + AuthLinkStore
        + RestaurantStore
        + OrderRepository
        + EvaluationStore
        + ?Sized
{
}
