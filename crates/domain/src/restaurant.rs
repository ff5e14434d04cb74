//! Registration, profiles and menus.

use std::time::Duration;

use chrono::Utc;
use common::{Money, ProductId, RestaurantId};
use store::{
    Account, Credential, MenuChanges, Product, ProductUpdate, Restaurant, Store,
};

use crate::{Actor, DomainError, SessionAuthenticator, auth::normalize_email, deadline::within};

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Clone, PartialEq, Eq)]
pub struct RegisterRestaurant {
    pub restaurant_name: String,
    pub manager_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

impl std::fmt::Debug for RegisterRestaurant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRestaurant")
            .field("restaurant_name", &self.restaurant_name)
            .field("manager_name", &self.manager_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateProfile {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductChange {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
}

/// A batch of edits to the caller's menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMenu {
    pub new_products: Vec<NewProduct>,
    pub updated_products: Vec<ProductChange>,
    pub deleted_product_ids: Vec<ProductId>,
}

#[derive(Clone)]
pub struct RestaurantService<S> {
    store: S,
    sessions: SessionAuthenticator<S>,
    timeout: Duration,
}

impl<S: Store + Clone> RestaurantService<S> {
    pub fn new(store: S, sessions: SessionAuthenticator<S>, timeout: Duration) -> Self {
        Self {
            store,
            sessions,
            timeout,
        }
    }

    /// Creates a manager account and its restaurant together.
    #[tracing::instrument(skip(self))]
    pub async fn register_restaurant(
        &self,
        cmd: RegisterRestaurant,
    ) -> Result<Restaurant, DomainError> {
        let restaurant_name = required("restaurant name", &cmd.restaurant_name)?;
        let manager_name = required("manager name", &cmd.manager_name)?;
        let email = validated_email(&cmd.email)?;
        if cmd.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::invalid(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        let hash = self.sessions.hasher().hash_blocking(&cmd.password).await?;
        let now = Utc::now();
        let manager = Account {
            id: common::AccountId::new(),
            name: manager_name,
            email,
            phone: optional(cmd.phone),
            credential: Credential::Password {
                hash,
            },
            created_at: now,
        };
        let restaurant = Restaurant {
            id: RestaurantId::new(),
            name: restaurant_name,
            description: None,
            manager_id: manager.id,
            created_at: now,
        };

        within(
            self.timeout,
            "restaurants.register",
            self.store.register_restaurant(manager, restaurant.clone()),
        )
        .await?;

        tracing::info!(restaurant_id = %restaurant.id, "Restaurant registered");
        Ok(restaurant)
    }

    /// Creates a passwordless customer account.
    #[tracing::instrument(skip(self))]
    pub async fn register_customer(&self, cmd: RegisterCustomer) -> Result<Account, DomainError> {
        let account = Account {
            id: common::AccountId::new(),
            name: required("name", &cmd.name)?,
            email: validated_email(&cmd.email)?,
            phone: optional(cmd.phone),
            credential: Credential::Passwordless,
            created_at: Utc::now(),
        };

        within(
            self.timeout,
            "accounts.insert",
            self.store.insert_account(account.clone()),
        )
        .await?;

        tracing::info!(account_id = %account.id, "Customer registered");
        Ok(account)
    }

    /// Returns the caller's own account.
    pub async fn get_profile(&self, token: &str) -> Result<Account, DomainError> {
        self.sessions.validate(token).await
    }

    /// Returns the restaurant the calling manager runs.
    pub async fn get_managed_restaurant(&self, token: &str) -> Result<Restaurant, DomainError> {
        let restaurant_id = self.managed_restaurant(token, "view a managed restaurant").await?;
        self.load(restaurant_id).await
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn update_profile(
        &self,
        token: &str,
        cmd: UpdateProfile,
    ) -> Result<Restaurant, DomainError> {
        let restaurant_id = self
            .managed_restaurant(token, "update a restaurant profile")
            .await?;
        let name = required("name", &cmd.name)?;

        within(
            self.timeout,
            "restaurants.update_profile",
            self.store
                .update_restaurant_profile(restaurant_id, name, optional(cmd.description)),
        )
        .await
    }

    /// Lists a restaurant's menu. Public.
    pub async fn get_menu(&self, restaurant_id: RestaurantId) -> Result<Vec<Product>, DomainError> {
        self.load(restaurant_id).await?;
        within(
            self.timeout,
            "products.list",
            self.store.list_products(restaurant_id),
        )
        .await
    }

    /// Applies a batch of menu edits atomically and returns the new menu.
    #[tracing::instrument(skip(self, token))]
    pub async fn update_menu(
        &self,
        token: &str,
        cmd: UpdateMenu,
    ) -> Result<Vec<Product>, DomainError> {
        let restaurant_id = self.managed_restaurant(token, "edit a menu").await?;

        let create = cmd
            .new_products
            .into_iter()
            .map(|p| {
                Ok(Product {
                    id: ProductId::new(),
                    restaurant_id,
                    name: required("product name", &p.name)?,
                    description: optional(p.description),
                    price: price(p.price_in_cents)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let update = cmd
            .updated_products
            .into_iter()
            .map(|p| {
                Ok(ProductUpdate {
                    id: p.id,
                    name: required("product name", &p.name)?,
                    description: optional(p.description),
                    price: price(p.price_in_cents)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let changes = MenuChanges {
            create,
            update,
            delete: cmd.deleted_product_ids,
        };
        if changes.is_empty() {
            return within(
                self.timeout,
                "products.list",
                self.store.list_products(restaurant_id),
            )
            .await;
        }

        let menu = within(
            self.timeout,
            "products.apply_changes",
            self.store.apply_menu_changes(restaurant_id, changes),
        )
        .await?;

        tracing::info!(%restaurant_id, products = menu.len(), "Menu updated");
        Ok(menu)
    }

    async fn managed_restaurant(
        &self,
        token: &str,
        action: &'static str,
    ) -> Result<RestaurantId, DomainError> {
        match self.sessions.authenticate(token).await? {
            Actor::Manager { restaurant_id, .. } => Ok(restaurant_id),
            Actor::Customer { .. } => Err(DomainError::Forbidden { action }),
        }
    }

    async fn load(&self, restaurant_id: RestaurantId) -> Result<Restaurant, DomainError> {
        within(
            self.timeout,
            "restaurants.get",
            self.store.get_restaurant(restaurant_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found("Restaurant", restaurant_id))
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validated_email(email: &str) -> Result<String, DomainError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::invalid("email address is malformed")),
    }
}

fn price(cents: i64) -> Result<Money, DomainError> {
    let price = Money::from_cents(cents);
    if !price.is_positive() {
        return Err(DomainError::invalid("prices must be positive"));
    }
    Ok(price)
}
