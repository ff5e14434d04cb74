use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AccountId, EvaluationId, Money, OrderId, OrderStatus, ProductId, RestaurantId, Role,
};
use sqlx::{
    PgPool, Postgres, QueryBuilder, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Account, AuthLink, Credential, Evaluation, MenuChanges, Order, OrderQuery, Page, PageRequest,
    Product, Restaurant, Result, Session, StoreError,
    store::{
        AccountStore, AuthLinkStore, EvaluationStore, OrderRepository, RestaurantStore,
        SessionStore,
    },
};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, role, password_hash, created_at";
const RESTAURANT_COLUMNS: &str = "id, name, description, manager_id, created_at";
const PRODUCT_COLUMNS: &str = "id, restaurant_id, name, description, price_cents";
const ORDER_COLUMNS: &str = "id, customer_id, customer_name, restaurant_id, items, total_cents, \
     status, placed_at, approved_at, dispatched_at, delivered_at, cancelled_at";
const EVALUATION_COLUMNS: &str =
    "id, order_id, restaurant_id, customer_id, rating, comment, created_at";

/// Which owner an order listing is scoped to.
#[derive(Clone, Copy)]
enum OrderScope {
    Customer(AccountId),
    Restaurant(RestaurantId),
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `url` and wraps it.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn row_to_account(row: PgRow) -> Result<Account> {
        let credential = match row.try_get::<Option<String>, _>("password_hash")? {
            Some(hash) => Credential::Password { hash },
            None => Credential::Passwordless,
        };
        let role: String = row.try_get("role")?;
        let role = role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let account = Account {
            id: AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            credential,
            created_at: row.try_get("created_at")?,
        };

        if account.role() != role {
            return Err(StoreError::Corrupt(format!(
                "account {} has role {role} but a {} credential",
                account.id,
                account.role()
            )));
        }
        Ok(account)
    }

    fn row_to_restaurant(row: PgRow) -> Result<Restaurant> {
        Ok(Restaurant {
            id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            manager_id: AccountId::from_uuid(row.try_get::<Uuid, _>("manager_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items: serde_json::Value = row.try_get("items")?;
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: AccountId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            customer_name: row.try_get("customer_name")?,
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            items: serde_json::from_value(items)?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            placed_at: row.try_get("placed_at")?,
            approved_at: row.try_get("approved_at")?,
            dispatched_at: row.try_get("dispatched_at")?,
            delivered_at: row.try_get("delivered_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
        })
    }

    fn row_to_evaluation(row: PgRow) -> Result<Evaluation> {
        let rating: i16 = row.try_get("rating")?;
        let rating = u8::try_from(rating)
            .map_err(|_| StoreError::Corrupt(format!("rating out of range: {rating}")))?;

        Ok(Evaluation {
            id: EvaluationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            customer_id: AccountId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            rating,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Appends the scope and filter predicates shared by the page and count
    /// queries of an order listing.
    fn push_order_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        scope: OrderScope,
        query: &OrderQuery,
    ) {
        match scope {
            OrderScope::Customer(id) => builder.push(" WHERE customer_id = ").push_bind(id.as_uuid()),
            OrderScope::Restaurant(id) => builder
                .push(" WHERE restaurant_id = ")
                .push_bind(id.as_uuid()),
        };

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(id) = query.order_id {
            builder.push(" AND id = ").push_bind(id.as_uuid());
        }
        if let Some(ref name) = query.customer_name {
            builder
                .push(" AND customer_name ILIKE ")
                .push_bind(format!("%{}%", escape_like(name)));
        }
    }

    async fn list_orders(&self, scope: OrderScope, query: &OrderQuery) -> Result<Page<Order>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        Self::push_order_filters(&mut count, scope, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        Self::push_order_filters(&mut select, scope, query);
        select
            .push(" ORDER BY placed_at DESC, id DESC LIMIT ")
            .push_bind(query.page.sql_limit())
            .push(" OFFSET ")
            .push_bind(query.page.sql_offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page_index: query.page.page_index,
            per_page: query.page.per_page,
            total_count: total as usize,
        })
    }
}

/// Maps a unique-constraint failure to `UniqueViolation`, carrying the
/// constraint name PostgreSQL reports.
fn map_unique(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
        && let Some(name) = db_err.constraint()
    {
        return StoreError::unique(name);
    }
    StoreError::Database(e)
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// The timestamp column stamped when an order enters `status`.
fn status_column(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "placed_at",
        OrderStatus::Approved => "approved_at",
        OrderStatus::Dispatched => "dispatched_at",
        OrderStatus::Delivered => "delivered_at",
        OrderStatus::Cancelled => "cancelled_at",
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn insert_account(&self, account: Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.role().as_str())
        .bind(account.password_hash())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_account).transpose()
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn insert_session(&self, session: Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, account_id, issued_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.account_id.as_uuid())
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT token_hash, account_id, issued_at, expires_at, revoked_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Session {
                token_hash: row.try_get("token_hash")?,
                account_id: AccountId::from_uuid(row.try_get::<Uuid, _>("account_id")?),
                issued_at: row.try_get("issued_at")?,
                expires_at: row.try_get("expires_at")?,
                revoked_at: row.try_get("revoked_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn revoke_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = $2 WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AuthLinkStore for PostgresStore {
    async fn insert_link(&self, link: AuthLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_links (code_hash, account_id, issued_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&link.code_hash)
        .bind(link.account_id.as_uuid())
        .bind(link.issued_at)
        .bind(link.expires_at)
        .bind(link.consumed_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(())
    }

    async fn consume_link(&self, code_hash: &str, now: DateTime<Utc>) -> Result<Option<AuthLink>> {
        // The row lock taken by UPDATE serializes concurrent consumers; the
        // losers re-evaluate the predicate and match nothing.
        let row = sqlx::query(
            r#"
            UPDATE auth_links
            SET consumed_at = $2
            WHERE code_hash = $1 AND consumed_at IS NULL AND expires_at > $2
            RETURNING code_hash, account_id, issued_at, expires_at, consumed_at
            "#,
        )
        .bind(code_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(AuthLink {
                code_hash: row.try_get("code_hash")?,
                account_id: AccountId::from_uuid(row.try_get::<Uuid, _>("account_id")?),
                issued_at: row.try_get("issued_at")?,
                expires_at: row.try_get("expires_at")?,
                consumed_at: row.try_get("consumed_at")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RestaurantStore for PostgresStore {
    async fn register_restaurant(&self, manager: Account, restaurant: Restaurant) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(manager.id.as_uuid())
        .bind(&manager.name)
        .bind(&manager.email)
        .bind(&manager.phone)
        .bind(manager.role().as_str())
        .bind(manager.password_hash())
        .bind(manager.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique)?;

        sqlx::query(
            r#"
            INSERT INTO restaurants (id, name, description, manager_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(restaurant.id.as_uuid())
        .bind(&restaurant.name)
        .bind(&restaurant.description)
        .bind(restaurant.manager_id.as_uuid())
        .bind(restaurant.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique)?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_restaurant).transpose()
    }

    async fn find_restaurant_by_manager(
        &self,
        manager_id: AccountId,
    ) -> Result<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE manager_id = $1"
        ))
        .bind(manager_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_restaurant).transpose()
    }

    async fn update_restaurant_profile(
        &self,
        id: RestaurantId,
        name: String,
        description: Option<String>,
    ) -> Result<Restaurant> {
        let row = sqlx::query(&format!(
            "UPDATE restaurants SET name = $2, description = $3 WHERE id = $1 \
             RETURNING {RESTAURANT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_restaurant(row),
            None => Err(StoreError::not_found("Restaurant", id)),
        }
    }

    async fn list_products(&self, restaurant_id: RestaurantId) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE restaurant_id = $1 ORDER BY name ASC, id ASC"
        ))
        .bind(restaurant_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn apply_menu_changes(
        &self,
        restaurant_id: RestaurantId,
        changes: MenuChanges,
    ) -> Result<Vec<Product>> {
        // Dropping the transaction on an early return rolls everything back
        let mut tx = self.pool.begin().await?;

        for update in &changes.update {
            let result = sqlx::query(
                r#"
                UPDATE products SET name = $3, description = $4, price_cents = $5
                WHERE id = $1 AND restaurant_id = $2
                "#,
            )
            .bind(update.id.as_uuid())
            .bind(restaurant_id.as_uuid())
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.price.cents())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("Product", update.id));
            }
        }

        for id in &changes.delete {
            let result = sqlx::query("DELETE FROM products WHERE id = $1 AND restaurant_id = $2")
                .bind(id.as_uuid())
                .bind(restaurant_id.as_uuid())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("Product", id));
            }
        }

        for product in &changes.create {
            sqlx::query(
                r#"
                INSERT INTO products (id, restaurant_id, name, description, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(restaurant_id.as_uuid())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.cents())
            .execute(&mut *tx)
            .await
            .map_err(map_unique)?;
        }

        tx.commit().await?;
        self.list_products(restaurant_id).await
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn create_order(&self, order: Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, customer_name, restaurant_id, items, total_cents,
                                status, placed_at, approved_at, dispatched_at, delivered_at, cancelled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(&order.customer_name)
        .bind(order.restaurant_id.as_uuid())
        .bind(items)
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.placed_at)
        .bind(order.approved_at)
        .bind(order.dispatched_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET status = $3, {} = $4 WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}",
            status_column(next)
        );

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_order(row);
        }

        // Nothing matched: either the order is gone or another writer won.
        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            None => Err(StoreError::not_found("Order", id)),
            Some(actual) => {
                let actual = actual
                    .parse::<OrderStatus>()
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                tracing::debug!(%id, %expected, %actual, "Conditional status update lost");
                Err(StoreError::StaleState {
                    order_id: id,
                    expected,
                    actual,
                })
            }
        }
    }

    async fn list_for_customer(
        &self,
        customer_id: AccountId,
        query: &OrderQuery,
    ) -> Result<Page<Order>> {
        self.list_orders(OrderScope::Customer(customer_id), query)
            .await
    }

    async fn list_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        query: &OrderQuery,
    ) -> Result<Page<Order>> {
        self.list_orders(OrderScope::Restaurant(restaurant_id), query)
            .await
    }

    async fn restaurant_orders_placed_between(
        &self,
        restaurant_id: RestaurantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE restaurant_id = $1 AND placed_at >= $2 AND placed_at < $3 \
             ORDER BY placed_at ASC"
        ))
        .bind(restaurant_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl EvaluationStore for PostgresStore {
    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluations (id, order_id, restaurant_id, customer_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(evaluation.id.as_uuid())
        .bind(evaluation.order_id.as_uuid())
        .bind(evaluation.restaurant_id.as_uuid())
        .bind(evaluation.customer_id.as_uuid())
        .bind(i16::from(evaluation.rating))
        .bind(&evaluation.comment)
        .bind(evaluation.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(())
    }

    async fn list_restaurant_evaluations(
        &self,
        restaurant_id: RestaurantId,
        page: PageRequest,
    ) -> Result<Page<Evaluation>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM evaluations WHERE restaurant_id = $1")
                .bind(restaurant_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations WHERE restaurant_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(restaurant_id.as_uuid())
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_evaluation)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page_index: page.page_index,
            per_page: page.per_page,
            total_count: total as usize,
        })
    }
}
