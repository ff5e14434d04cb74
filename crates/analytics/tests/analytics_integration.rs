use std::sync::Arc;
use std::time::Duration;

use analytics::AnalyticsService;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{AccountId, Money, OrderId, OrderStatus, ProductId, RestaurantId};
use domain::{
    AuthSettings, DomainError, DomainSettings, InMemoryLinkSender, RegisterCustomer,
    RegisterRestaurant, Services,
};
use store::{InMemoryStore, Order, OrderLine, OrderRepository};

const PASSWORD: &str = "pizza-oven-42";

struct Fixture {
    store: InMemoryStore,
    services: Services<InMemoryStore>,
    analytics: AnalyticsService<InMemoryStore>,
    sender: InMemoryLinkSender,
    restaurant_id: RestaurantId,
    manager: String,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let sender = InMemoryLinkSender::new();
    let settings = DomainSettings {
        auth: AuthSettings {
            password_iterations: 2,
            ..AuthSettings::default()
        },
        ..DomainSettings::default()
    };
    let services = Services::new(store.clone(), &settings, Arc::new(sender.clone()));
    let analytics = AnalyticsService::new(
        store.clone(),
        services.sessions.clone(),
        Duration::from_secs(5),
    );

    let restaurant = services
        .restaurants
        .register_restaurant(RegisterRestaurant {
            restaurant_name: "Pizza Shop".to_string(),
            manager_name: "Chef".to_string(),
            email: "chef@example.com".to_string(),
            phone: None,
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let manager = services
        .sessions
        .login("chef@example.com", PASSWORD)
        .await
        .unwrap()
        .token;

    Fixture {
        store,
        services,
        analytics,
        sender,
        restaurant_id: restaurant.id,
        manager,
    }
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl Fixture {
    async fn seed(
        &self,
        restaurant_id: RestaurantId,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
        product: (ProductId, &str, u32),
        unit_cents: i64,
    ) {
        let line = OrderLine {
            product_id: product.0,
            product_name: product.1.to_string(),
            quantity: product.2,
            unit_price: Money::from_cents(unit_cents),
        };
        self.store
            .create_order(Order {
                id: OrderId::new(),
                customer_id: AccountId::new(),
                customer_name: "Ada".to_string(),
                restaurant_id,
                total: line.total_price(),
                items: vec![line],
                status,
                placed_at,
                approved_at: None,
                dispatched_at: None,
                delivered_at: None,
                cancelled_at: None,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn month_metrics_compare_with_last_month() {
    let f = fixture().await;
    let pizza = ProductId::new();
    let now = at(2026, 3, 15, 18);

    f.seed(f.restaurant_id, at(2026, 3, 1, 0), OrderStatus::Delivered, (pizza, "Pizza", 2), 2000).await;
    f.seed(f.restaurant_id, at(2026, 3, 10, 12), OrderStatus::Cancelled, (pizza, "Pizza", 1), 2000).await;
    f.seed(f.restaurant_id, at(2026, 2, 28, 23), OrderStatus::Approved, (pizza, "Pizza", 1), 2000).await;
    f.seed(f.restaurant_id, at(2026, 2, 3, 9), OrderStatus::Cancelled, (pizza, "Pizza", 1), 2000).await;
    // Another restaurant's orders never leak in
    f.seed(RestaurantId::new(), at(2026, 3, 2, 0), OrderStatus::Delivered, (pizza, "Pizza", 9), 2000).await;

    let receipt = f.analytics.month_receipt(&f.manager, now).await.unwrap();
    assert_eq!(receipt.receipt, Money::from_cents(4000));
    assert_eq!(receipt.diff_from_last_month, 100.0);

    let amount = f.analytics.month_orders_amount(&f.manager, now).await.unwrap();
    assert_eq!(amount.amount, 2);
    assert_eq!(amount.diff_from_last_month, 0.0);

    let cancelled = f
        .analytics
        .month_canceled_orders_amount(&f.manager, now)
        .await
        .unwrap();
    assert_eq!(cancelled.amount, 1);
    assert_eq!(cancelled.diff_from_last_month, 0.0);
}

#[tokio::test]
async fn day_orders_compare_with_yesterday() {
    let f = fixture().await;
    let pizza = ProductId::new();
    let now = at(2026, 3, 15, 18);

    for hour in [1, 5, 9] {
        f.seed(f.restaurant_id, at(2026, 3, 15, hour), OrderStatus::Pending, (pizza, "Pizza", 1), 1000).await;
    }
    for hour in [10, 11] {
        f.seed(f.restaurant_id, at(2026, 3, 14, hour), OrderStatus::Pending, (pizza, "Pizza", 1), 1000).await;
    }

    let day = f.analytics.day_orders_amount(&f.manager, now).await.unwrap();
    assert_eq!(day.amount, 3);
    assert_eq!(day.diff_from_yesterday, 50.0);
}

#[tokio::test]
async fn daily_receipt_respects_the_range() {
    let f = fixture().await;
    let pizza = ProductId::new();
    let now = at(2026, 3, 15, 18);

    f.seed(f.restaurant_id, at(2026, 3, 9, 12), OrderStatus::Delivered, (pizza, "Pizza", 1), 1500).await;
    f.seed(f.restaurant_id, at(2026, 3, 8, 12), OrderStatus::Delivered, (pizza, "Pizza", 1), 9999).await;
    f.seed(f.restaurant_id, at(2026, 3, 15, 12), OrderStatus::Pending, (pizza, "Pizza", 2), 1000).await;

    let week = f
        .analytics
        .daily_receipt_in_period(&f.manager, None, None, now)
        .await
        .unwrap();
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].date, date(2026, 3, 9));
    assert_eq!(week[0].receipt, Money::from_cents(1500));
    assert_eq!(week[6].date, date(2026, 3, 15));
    assert_eq!(week[6].receipt, Money::from_cents(2000));

    let too_long = f
        .analytics
        .daily_receipt_in_period(&f.manager, Some(date(2026, 3, 1)), Some(date(2026, 3, 8)), now)
        .await;
    assert!(matches!(too_long, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn popular_products_cover_all_time() {
    let f = fixture().await;
    let pizza = ProductId::new();
    let soda = ProductId::new();
    let now = at(2026, 3, 15, 18);

    f.seed(f.restaurant_id, at(2024, 1, 1, 12), OrderStatus::Delivered, (soda, "Soda", 6), 300).await;
    f.seed(f.restaurant_id, at(2026, 3, 15, 12), OrderStatus::Delivered, (pizza, "Pizza", 4), 2000).await;
    f.seed(f.restaurant_id, at(2026, 3, 15, 13), OrderStatus::Cancelled, (pizza, "Pizza", 10), 2000).await;

    let top = f.analytics.popular_products(&f.manager, now).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].product, "Soda");
    assert_eq!(top[0].amount, 6);
    assert_eq!(top[1].amount, 4);
}

#[tokio::test]
async fn customers_cannot_read_metrics() {
    let f = fixture().await;
    f.services
        .restaurants
        .register_customer(RegisterCustomer {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    f.services.links.request_link("ada@example.com").await.unwrap();
    let code = f.sender.last_code_for("ada@example.com").unwrap();
    let customer = f.services.links.consume(&code).await.unwrap().token;

    let now = Utc::now();
    assert!(matches!(
        f.analytics.month_receipt(&customer, now).await,
        Err(DomainError::Forbidden { .. })
    ));
    assert!(matches!(
        f.analytics.popular_products("", now).await,
        Err(DomainError::Unauthenticated)
    ));
}

#[tokio::test]
async fn metrics_serialize_in_camel_case() {
    let f = fixture().await;
    let receipt = f
        .analytics
        .month_receipt(&f.manager, at(2026, 3, 15, 18))
        .await
        .unwrap();
    let json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json, serde_json::json!({ "receipt": 0, "diffFromLastMonth": 0.0 }));
}
