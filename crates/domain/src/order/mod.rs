//! Order placement and the authorization-gated lifecycle.

mod commands;
mod lifecycle;
mod transition;

pub use commands::{OrderItemRequest, PlaceOrder};
pub use lifecycle::{OrderLifecycle, PreparedTransition};
pub use transition::{Party, Transition, available_from};
