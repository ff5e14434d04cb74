//! Shared fixtures for the domain integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use common::{ProductId, RestaurantId};
use domain::{
    AuthSettings, DomainSettings, InMemoryLinkSender, NewProduct, PlaceOrder, RegisterCustomer,
    RegisterRestaurant, Services, UpdateMenu,
};
use store::{Account, InMemoryStore, Order};

pub const PASSWORD: &str = "pizza-oven-42";

/// A fresh in-memory backend with every service wired to it.
pub struct World {
    pub store: InMemoryStore,
    pub sender: InMemoryLinkSender,
    pub services: Services<InMemoryStore>,
}

impl World {
    pub fn new() -> Self {
        Self::with_settings(DomainSettings {
            auth: AuthSettings {
                password_iterations: 2,
                ..AuthSettings::default()
            },
            ..DomainSettings::default()
        })
    }

    pub fn with_settings(settings: DomainSettings) -> Self {
        let store = InMemoryStore::new();
        let sender = InMemoryLinkSender::new();
        let services = Services::new(store.clone(), &settings, Arc::new(sender.clone()));
        Self {
            store,
            sender,
            services,
        }
    }

    /// Registers a restaurant and signs its manager in.
    pub async fn restaurant(&self, email: &str) -> (RestaurantId, String) {
        let restaurant = self
            .services
            .restaurants
            .register_restaurant(RegisterRestaurant {
                restaurant_name: "Pizza Shop".to_string(),
                manager_name: "Chef".to_string(),
                email: email.to_string(),
                phone: None,
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        let session = self.services.sessions.login(email, PASSWORD).await.unwrap();
        (restaurant.id, session.token)
    }

    /// Registers a customer and signs them in through an authentication link.
    pub async fn customer(&self, name: &str, email: &str) -> (Account, String) {
        let account = self
            .services
            .restaurants
            .register_customer(RegisterCustomer {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
            })
            .await
            .unwrap();
        self.services.links.request_link(email).await.unwrap();
        let code = self.sender.last_code_for(email).unwrap();
        let session = self.services.links.consume(&code).await.unwrap();
        (account, session.token)
    }

    /// Adds one product to the manager's menu and returns its id.
    pub async fn product(&self, manager_token: &str, name: &str, cents: i64) -> ProductId {
        let menu = self
            .services
            .restaurants
            .update_menu(manager_token, UpdateMenu {
                new_products: vec![NewProduct {
                    name: name.to_string(),
                    description: None,
                    price_in_cents: cents,
                }],
                ..Default::default()
            })
            .await
            .unwrap();
        menu.into_iter().find(|p| p.name == name).unwrap().id
    }

    /// Places a one-line order.
    pub async fn order(
        &self,
        customer_token: &str,
        restaurant_id: RestaurantId,
        product_id: ProductId,
    ) -> Order {
        self.services
            .orders
            .place_order(
                customer_token,
                PlaceOrder::new(restaurant_id).item(product_id, 1),
            )
            .await
            .unwrap()
    }
}

/// A restaurant, its signed-in manager, a signed-in customer and a pending
/// order between them.
pub struct Scenario {
    pub world: World,
    pub restaurant_id: RestaurantId,
    pub manager: String,
    pub customer: Account,
    pub customer_token: String,
    pub order: Order,
}

impl Scenario {
    pub async fn new() -> Self {
        let world = World::new();
        let (restaurant_id, manager) = world.restaurant("chef@example.com").await;
        let (customer, customer_token) = world.customer("Ada Lovelace", "ada@example.com").await;
        let pizza = world.product(&manager, "Margherita", 2500).await;
        let order = world.order(&customer_token, restaurant_id, pizza).await;
        Self {
            world,
            restaurant_id,
            manager,
            customer,
            customer_token,
            order,
        }
    }
}
