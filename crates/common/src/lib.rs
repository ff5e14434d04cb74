//! Shared vocabulary for the food-ordering backend.
//!
//! Every other crate speaks in these types: typed identifiers, money in
//! cents, the order status graph and the account role.

mod ids;
mod money;
mod role;
mod status;

pub use ids::{AccountId, EvaluationId, OrderId, ProductId, RestaurantId};
pub use money::Money;
pub use role::{ParseRoleError, Role};
pub use status::{OrderStatus, ParseStatusError};
