//! Persistence boundary for the food-ordering backend.
//!
//! The repository traits in [`store`] are the only way the domain touches
//! durable state. Two implementations are provided: [`InMemoryStore`] for
//! tests and local runs, and [`PostgresStore`] for production. Both honour
//! the same atomicity contracts:
//! - order status changes are compare-and-swap on the expected prior status
//! - an authentication link is consumed at most once
//! - at most one evaluation exists per order

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError, constraint};
pub use memory::InMemoryStore;
pub use model::{
    Account, AuthLink, Credential, Evaluation, MenuChanges, Order, OrderLine, Product,
    ProductUpdate, Restaurant, Session,
};
pub use postgres::PostgresStore;
pub use query::{DEFAULT_PAGE_SIZE, OrderQuery, Page, PageRequest};
pub use store::{
    AccountStore, AuthLinkStore, EvaluationStore, OrderRepository, RestaurantStore, SessionStore,
    Store,
};
