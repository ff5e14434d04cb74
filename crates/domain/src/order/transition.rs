//! The order transition table.
//!
//! ```text
//! | Transition | Allowed actor                        | From               | To         |
//! |------------|--------------------------------------|--------------------|------------|
//! | approve    | restaurant manager                   | Pending            | Approved   |
//! | cancel     | owning customer, restaurant manager  | Pending, Approved  | Cancelled  |
//! | dispatch   | restaurant manager                   | Approved           | Dispatched |
//! | deliver    | restaurant manager                   | Dispatched         | Delivered  |
//! ```
//!
//! Placing an order is not a transition: it creates the order in `Pending`.

use common::OrderStatus;
use store::Order;

use crate::{Actor, DomainError};

/// Who may request a transition, relative to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The customer who placed the order.
    OwningCustomer,
    /// The manager of the restaurant the order was placed with.
    RestaurantManager,
}

impl Party {
    pub fn includes(&self, actor: &Actor, order: &Order) -> bool {
        match self {
            Party::OwningCustomer => actor.is_customer(order.customer_id),
            Party::RestaurantManager => actor.manages(order.restaurant_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Approve,
    Cancel,
    Dispatch,
    Deliver,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Approve,
        Transition::Cancel,
        Transition::Dispatch,
        Transition::Deliver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Cancel => "cancel",
            Transition::Dispatch => "dispatch",
            Transition::Deliver => "deliver",
        }
    }

    /// Statuses this transition may start from.
    pub fn from_states(&self) -> &'static [OrderStatus] {
        match self {
            Transition::Approve => &[OrderStatus::Pending],
            // Dispatch is the point of no return for cancellation
            Transition::Cancel => &[OrderStatus::Pending, OrderStatus::Approved],
            Transition::Dispatch => &[OrderStatus::Approved],
            Transition::Deliver => &[OrderStatus::Dispatched],
        }
    }

    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Approve => OrderStatus::Approved,
            Transition::Cancel => OrderStatus::Cancelled,
            Transition::Dispatch => OrderStatus::Dispatched,
            Transition::Deliver => OrderStatus::Delivered,
        }
    }

    pub fn parties(&self) -> &'static [Party] {
        match self {
            Transition::Cancel => &[Party::OwningCustomer, Party::RestaurantManager],
            Transition::Approve | Transition::Dispatch | Transition::Deliver => {
                &[Party::RestaurantManager]
            }
        }
    }

    pub fn starts_from(&self, status: OrderStatus) -> bool {
        self.from_states().contains(&status)
    }

    /// Checks the actor's role and ownership. Independent of the order's
    /// status.
    pub fn authorize(&self, actor: &Actor, order: &Order) -> Result<(), DomainError> {
        if self.parties().iter().any(|p| p.includes(actor, order)) {
            Ok(())
        } else {
            Err(DomainError::Forbidden {
                action: self.forbidden_action(),
            })
        }
    }

    pub fn check_precondition(&self, current: OrderStatus) -> Result<(), DomainError> {
        if self.starts_from(current) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                action: self.as_str(),
                current,
            })
        }
    }

    fn forbidden_action(&self) -> &'static str {
        match self {
            Transition::Approve => "approve this order",
            Transition::Cancel => "cancel this order",
            Transition::Dispatch => "dispatch this order",
            Transition::Deliver => "deliver this order",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transitions available from `status`.
pub fn available_from(status: OrderStatus) -> impl Iterator<Item = Transition> {
    Transition::ALL
        .into_iter()
        .filter(move |t| t.starts_from(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AccountId, Money, OrderId, RestaurantId};

    fn order() -> Order {
        Order {
            id: OrderId::new(),
            customer_id: AccountId::new(),
            customer_name: "Ada".to_string(),
            restaurant_id: RestaurantId::new(),
            items: vec![],
            total: Money::zero(),
            status: OrderStatus::Pending,
            placed_at: Utc::now(),
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        assert_eq!(available_from(OrderStatus::Delivered).count(), 0);
        assert_eq!(available_from(OrderStatus::Cancelled).count(), 0);
    }

    #[test]
    fn cancel_window_closes_at_dispatch() {
        assert!(Transition::Cancel.check_precondition(OrderStatus::Pending).is_ok());
        assert!(Transition::Cancel.check_precondition(OrderStatus::Approved).is_ok());
        assert!(matches!(
            Transition::Cancel.check_precondition(OrderStatus::Dispatched),
            Err(DomainError::InvalidTransition {
                action: "cancel",
                current: OrderStatus::Dispatched,
            })
        ));
    }

    #[test]
    fn manager_actions_require_owning_manager() {
        let order = order();
        let own = Actor::Manager {
            account_id: AccountId::new(),
            restaurant_id: order.restaurant_id,
        };
        let other = Actor::Manager {
            account_id: AccountId::new(),
            restaurant_id: RestaurantId::new(),
        };
        let owner = Actor::Customer {
            account_id: order.customer_id,
        };

        for t in [Transition::Approve, Transition::Dispatch, Transition::Deliver] {
            assert!(t.authorize(&own, &order).is_ok());
            assert!(matches!(
                t.authorize(&other, &order),
                Err(DomainError::Forbidden { .. })
            ));
            assert!(t.authorize(&owner, &order).is_err());
        }
    }

    #[test]
    fn cancel_allows_owner_or_manager_only() {
        let order = order();
        let owner = Actor::Customer {
            account_id: order.customer_id,
        };
        let stranger = Actor::Customer {
            account_id: AccountId::new(),
        };
        let manager = Actor::Manager {
            account_id: AccountId::new(),
            restaurant_id: order.restaurant_id,
        };

        assert!(Transition::Cancel.authorize(&owner, &order).is_ok());
        assert!(Transition::Cancel.authorize(&manager, &order).is_ok());
        assert!(Transition::Cancel.authorize(&stranger, &order).is_err());
    }

    #[test]
    fn targets_are_distinct_and_reachable_only_once() {
        // Each non-initial status is entered by exactly one transition
        for status in OrderStatus::ALL {
            let entering = Transition::ALL
                .iter()
                .filter(|t| t.target() == status)
                .count();
            let expected = usize::from(status != OrderStatus::Pending);
            assert_eq!(entering, expected, "{status}");
        }
    }
}
