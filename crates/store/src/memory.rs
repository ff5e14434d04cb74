use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, EvaluationId, OrderId, OrderStatus, ProductId, RestaurantId};
use tokio::sync::RwLock;

use crate::{
    Account, AuthLink, Evaluation, MenuChanges, Order, OrderQuery, Page, PageRequest, Product,
    Restaurant, Result, Session, StoreError, constraint,
    store::{
        AccountStore, AuthLinkStore, EvaluationStore, OrderRepository, RestaurantStore,
        SessionStore,
    },
};

/// In-memory store implementation for testing and local runs.
///
/// Every conditional write takes the relevant write lock for the whole
/// check-and-write, which gives the same atomicity the PostgreSQL
/// implementation gets from conditional `UPDATE`s and unique constraints.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    links: Arc<RwLock<HashMap<String, AuthLink>>>,
    restaurants: Arc<RwLock<HashMap<RestaurantId, Restaurant>>>,
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    evaluations: Arc<RwLock<HashMap<EvaluationId, Evaluation>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the total number of sessions stored, revoked ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        self.accounts.write().await.clear();
        self.sessions.write().await.clear();
        self.links.write().await.clear();
        self.restaurants.write().await.clear();
        self.products.write().await.clear();
        self.orders.write().await.clear();
        self.evaluations.write().await.clear();
    }

    fn list_orders<'a>(
        orders: impl Iterator<Item = &'a Order>,
        query: &OrderQuery,
    ) -> Page<Order> {
        let mut matching: Vec<Order> = orders.filter(|o| query.matches(o)).cloned().collect();
        sort_newest_first(&mut matching);
        Page::from_sorted(matching, query.page)
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::unique(constraint::ACCOUNT_EMAIL));
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token_hash) {
            return Err(StoreError::unique(constraint::SESSION_TOKEN));
        }
        sessions.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn revoke_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token_hash) {
            Some(session) if session.revoked_at.is_none() => {
                session.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AuthLinkStore for InMemoryStore {
    async fn insert_link(&self, link: AuthLink) -> Result<()> {
        let mut links = self.links.write().await;
        if links.contains_key(&link.code_hash) {
            return Err(StoreError::unique(constraint::AUTH_LINK_CODE));
        }
        links.insert(link.code_hash.clone(), link);
        Ok(())
    }

    async fn consume_link(&self, code_hash: &str, now: DateTime<Utc>) -> Result<Option<AuthLink>> {
        let mut links = self.links.write().await;
        match links.get_mut(code_hash) {
            Some(link) if link.is_consumable(now) => {
                link.consumed_at = Some(now);
                Ok(Some(link.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl RestaurantStore for InMemoryStore {
    async fn register_restaurant(&self, manager: Account, restaurant: Restaurant) -> Result<()> {
        // Lock order: accounts before restaurants, everywhere.
        let mut accounts = self.accounts.write().await;
        let mut restaurants = self.restaurants.write().await;

        if accounts.values().any(|a| a.email == manager.email) {
            return Err(StoreError::unique(constraint::ACCOUNT_EMAIL));
        }
        if restaurants
            .values()
            .any(|r| r.manager_id == restaurant.manager_id)
        {
            return Err(StoreError::unique(constraint::RESTAURANT_MANAGER));
        }

        accounts.insert(manager.id, manager);
        restaurants.insert(restaurant.id, restaurant);
        Ok(())
    }

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        Ok(self.restaurants.read().await.get(&id).cloned())
    }

    async fn find_restaurant_by_manager(
        &self,
        manager_id: AccountId,
    ) -> Result<Option<Restaurant>> {
        let restaurants = self.restaurants.read().await;
        Ok(restaurants
            .values()
            .find(|r| r.manager_id == manager_id)
            .cloned())
    }

    async fn update_restaurant_profile(
        &self,
        id: RestaurantId,
        name: String,
        description: Option<String>,
    ) -> Result<Restaurant> {
        let mut restaurants = self.restaurants.write().await;
        let restaurant = restaurants
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Restaurant", id))?;
        restaurant.name = name;
        restaurant.description = description;
        Ok(restaurant.clone())
    }

    async fn list_products(&self, restaurant_id: RestaurantId) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let mut menu: Vec<Product> = products
            .values()
            .filter(|p| p.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        menu.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(menu)
    }

    async fn apply_menu_changes(
        &self,
        restaurant_id: RestaurantId,
        changes: MenuChanges,
    ) -> Result<Vec<Product>> {
        {
            let mut products = self.products.write().await;

            // Validate everything before touching anything.
            let owned = |id: &ProductId| {
                products
                    .get(id)
                    .is_some_and(|p| p.restaurant_id == restaurant_id)
            };
            if let Some(update) = changes.update.iter().find(|u| !owned(&u.id)) {
                return Err(StoreError::not_found("Product", update.id));
            }
            if let Some(id) = changes.delete.iter().find(|id| !owned(id)) {
                return Err(StoreError::not_found("Product", id));
            }

            for update in changes.update {
                if let Some(product) = products.get_mut(&update.id) {
                    product.name = update.name;
                    product.description = update.description;
                    product.price = update.price;
                }
            }
            for id in &changes.delete {
                products.remove(id);
            }
            for product in changes.create {
                products.insert(product.id, Product {
                    restaurant_id,
                    ..product
                });
            }
        }

        self.list_products(restaurant_id).await
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::unique(constraint::ORDER_ID));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;

        if order.status != expected {
            return Err(StoreError::StaleState {
                order_id: id,
                expected,
                actual: order.status,
            });
        }

        order.record_status(next, at);
        Ok(order.clone())
    }

    async fn list_for_customer(
        &self,
        customer_id: AccountId,
        query: &OrderQuery,
    ) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        Ok(Self::list_orders(
            orders.values().filter(|o| o.customer_id == customer_id),
            query,
        ))
    }

    async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        query: &OrderQuery,
    ) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        Ok(Self::list_orders(
            orders.values().filter(|o| o.restaurant_id == restaurant_id),
            query,
        ))
    }

    async fn restaurant_orders_placed_between(
        &self,
        restaurant_id: RestaurantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id && o.placed_at >= from && o.placed_at < to)
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.placed_at);
        Ok(matching)
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<()> {
        let mut evaluations = self.evaluations.write().await;
        if evaluations
            .values()
            .any(|e| e.order_id == evaluation.order_id)
        {
            return Err(StoreError::unique(constraint::EVALUATION_ORDER));
        }
        evaluations.insert(evaluation.id, evaluation);
        Ok(())
    }

    async fn list_restaurant_evaluations(
        &self,
        restaurant_id: RestaurantId,
        page: PageRequest,
    ) -> Result<Page<Evaluation>> {
        let evaluations = self.evaluations.read().await;
        let mut matching: Vec<Evaluation> = evaluations
            .values()
            .filter(|e| e.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Page::from_sorted(matching, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credential, OrderLine, ProductUpdate};
    use chrono::Duration;
    use common::Money;

    fn customer(email: &str) -> Account {
        Account {
            id: AccountId::new(),
            name: "Grace Hopper".to_string(),
            email: email.to_string(),
            phone: None,
            credential: Credential::Passwordless,
            created_at: Utc::now(),
        }
    }

    fn manager(email: &str) -> Account {
        Account {
            credential: Credential::Password {
                hash: "pbkdf2-sha256$1$00$00".to_string(),
            },
            ..customer(email)
        }
    }

    fn restaurant_for(manager: &Account) -> Restaurant {
        Restaurant {
            id: RestaurantId::new(),
            name: "Pizza Shop".to_string(),
            description: None,
            manager_id: manager.id,
            created_at: Utc::now(),
        }
    }

    fn product(restaurant_id: RestaurantId, name: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(),
            restaurant_id,
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
        }
    }

    fn pending_order(restaurant_id: RestaurantId, customer_id: AccountId) -> Order {
        let line = OrderLine {
            product_id: ProductId::new(),
            product_name: "Margherita".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1500),
        };
        Order {
            id: OrderId::new(),
            customer_id,
            customer_name: "Grace Hopper".to_string(),
            restaurant_id,
            total: line.total_price(),
            items: vec![line],
            status: OrderStatus::Pending,
            placed_at: Utc::now(),
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_account(customer("grace@example.com"))
            .await
            .unwrap();

        let result = store.insert_account(customer("grace@example.com")).await;
        assert!(
            result
                .unwrap_err()
                .is_unique_violation_of(constraint::ACCOUNT_EMAIL)
        );

        let manager = manager("grace@example.com");
        let restaurant = restaurant_for(&manager);
        let result = store.register_restaurant(manager, restaurant).await;
        assert!(
            result
                .unwrap_err()
                .is_unique_violation_of(constraint::ACCOUNT_EMAIL)
        );
    }

    #[tokio::test]
    async fn register_restaurant_links_manager() {
        let store = InMemoryStore::new();
        let manager = manager("chef@example.com");
        let restaurant = restaurant_for(&manager);

        store
            .register_restaurant(manager.clone(), restaurant.clone())
            .await
            .unwrap();

        let found = store.find_restaurant_by_manager(manager.id).await.unwrap();
        assert_eq!(found, Some(restaurant));
        assert!(store.get_account(manager.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_status_is_conditional() {
        let store = InMemoryStore::new();
        let order = pending_order(RestaurantId::new(), AccountId::new());
        store.create_order(order.clone()).await.unwrap();

        let updated = store
            .update_status(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Approved,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Approved);
        assert!(updated.approved_at.is_some());

        // Second writer still believes the order is pending
        let result = store
            .update_status(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                Utc::now(),
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::StaleState {
                expected: OrderStatus::Pending,
                actual: OrderStatus::Approved,
                ..
            })
        ));

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Approved);
        assert!(stored.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn update_status_unknown_order() {
        let store = InMemoryStore::new();
        let result = store
            .update_status(
                OrderId::new(),
                OrderStatus::Pending,
                OrderStatus::Approved,
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn link_is_consumed_once() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_link(AuthLink {
                code_hash: "abc".to_string(),
                account_id: AccountId::new(),
                issued_at: now,
                expires_at: now + Duration::minutes(15),
                consumed_at: None,
            })
            .await
            .unwrap();

        assert!(store.consume_link("abc", now).await.unwrap().is_some());
        assert!(store.consume_link("abc", now).await.unwrap().is_none());
        assert!(store.consume_link("unknown", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_link_is_not_consumed() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_link(AuthLink {
                code_hash: "abc".to_string(),
                account_id: AccountId::new(),
                issued_at: now - Duration::minutes(20),
                expires_at: now - Duration::minutes(5),
                consumed_at: None,
            })
            .await
            .unwrap();

        assert!(store.consume_link("abc", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_session_reports_first_revocation_only() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_session(Session {
                token_hash: "t".to_string(),
                account_id: AccountId::new(),
                issued_at: now,
                expires_at: now + Duration::hours(1),
                revoked_at: None,
            })
            .await
            .unwrap();

        assert!(store.revoke_session("t", now).await.unwrap());
        assert!(!store.revoke_session("t", now).await.unwrap());
        assert!(!store.revoke_session("missing", now).await.unwrap());
        assert!(
            !store
                .get_session("t")
                .await
                .unwrap()
                .unwrap()
                .is_active(now)
        );
    }

    #[tokio::test]
    async fn menu_changes_apply_atomically() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();
        let pizza = product(restaurant_id, "Pizza", 3000);
        let soda = product(restaurant_id, "Soda", 500);
        store
            .apply_menu_changes(restaurant_id, MenuChanges {
                create: vec![pizza.clone(), soda.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        // A foreign product id rejects the whole batch
        let foreign = product(RestaurantId::new(), "Elsewhere", 100);
        let result = store
            .apply_menu_changes(restaurant_id, MenuChanges {
                delete: vec![soda.id, foreign.id],
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(store.list_products(restaurant_id).await.unwrap().len(), 2);

        let menu = store
            .apply_menu_changes(restaurant_id, MenuChanges {
                update: vec![ProductUpdate {
                    id: pizza.id,
                    name: "Pizza Grande".to_string(),
                    description: Some("Large".to_string()),
                    price: Money::from_cents(4000),
                }],
                delete: vec![soda.id],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].name, "Pizza Grande");
        assert_eq!(menu[0].price.cents(), 4000);
    }

    #[tokio::test]
    async fn listings_are_scoped_and_newest_first() {
        let store = InMemoryStore::new();
        let restaurant_id = RestaurantId::new();
        let customer_id = AccountId::new();

        let mut older = pending_order(restaurant_id, customer_id);
        older.placed_at = Utc::now() - Duration::hours(1);
        let newer = pending_order(restaurant_id, customer_id);
        let elsewhere = pending_order(RestaurantId::new(), AccountId::new());

        for order in [older.clone(), newer.clone(), elsewhere] {
            store.create_order(order).await.unwrap();
        }

        let page = store
            .list_for_restaurant(restaurant_id, &OrderQuery::new())
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items[0].id, newer.id);
        assert_eq!(page.items[1].id, older.id);

        let page = store
            .list_for_customer(customer_id, &OrderQuery::new().order_id(older.id))
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn second_evaluation_for_order_is_rejected() {
        let store = InMemoryStore::new();
        let order_id = OrderId::new();
        let evaluation = |rating| Evaluation {
            id: EvaluationId::new(),
            order_id,
            restaurant_id: RestaurantId::new(),
            customer_id: AccountId::new(),
            rating,
            comment: None,
            created_at: Utc::now(),
        };

        store.insert_evaluation(evaluation(5)).await.unwrap();
        let result = store.insert_evaluation(evaluation(1)).await;
        assert!(
            result
                .unwrap_err()
                .is_unique_violation_of(constraint::EVALUATION_ORDER)
        );
    }
}
