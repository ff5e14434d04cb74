//! Domain layer for the food-ordering backend.
//!
//! This crate provides:
//! - Session authentication for managers (password) and customers (links)
//! - The order lifecycle engine, gated by role and ownership
//! - Evaluations of delivered orders
//! - Restaurant registration, profiles and menus
//!
//! Services are generic over a [`store::Store`] and never read the
//! environment; they are configured with [`DomainSettings`].

pub mod actor;
pub mod auth;
pub mod deadline;
pub mod error;
pub mod evaluation;
pub mod order;
pub mod restaurant;
pub mod settings;

use std::sync::Arc;

pub use actor::Actor;
pub use auth::{
    AuthLinkIssuer, AuthLinkMessage, DeliveryError, InMemoryLinkSender, IssuedSession,
    LinkSender, LogLinkSender, PasswordHasher, SessionAuthenticator,
};
pub use error::DomainError;
pub use evaluation::{EvaluationManager, SubmitEvaluation};
pub use order::{OrderItemRequest, OrderLifecycle, PlaceOrder, PreparedTransition, Transition};
pub use restaurant::{
    NewProduct, ProductChange, RegisterCustomer, RegisterRestaurant, RestaurantService,
    UpdateMenu, UpdateProfile,
};
pub use settings::{AuthSettings, DomainSettings};

use store::Store;

/// Every domain service, wired to one store.
#[derive(Clone)]
pub struct Services<S> {
    pub sessions: SessionAuthenticator<S>,
    pub links: AuthLinkIssuer<S>,
    pub orders: OrderLifecycle<S>,
    pub evaluations: EvaluationManager<S>,
    pub restaurants: RestaurantService<S>,
}

impl<S: Store + Clone> Services<S> {
    pub fn new(store: S, settings: &DomainSettings, sender: Arc<dyn LinkSender>) -> Self {
        let timeout = settings.store_timeout;
        let sessions = SessionAuthenticator::new(store.clone(), &settings.auth, timeout);

        Self {
            links: AuthLinkIssuer::new(
                store.clone(),
                sessions.clone(),
                sender,
                &settings.auth,
                timeout,
            ),
            orders: OrderLifecycle::new(store.clone(), sessions.clone(), timeout),
            evaluations: EvaluationManager::new(store.clone(), sessions.clone(), timeout),
            restaurants: RestaurantService::new(store, sessions.clone(), timeout),
            sessions,
        }
    }
}
