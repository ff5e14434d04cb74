use common::{AccountId, RestaurantId, Role};

/// An authenticated caller, resolved from a session.
///
/// Each operation decides what it allows by matching on the variant; there
/// is no role hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Manager {
        account_id: AccountId,
        restaurant_id: RestaurantId,
    },
    Customer {
        account_id: AccountId,
    },
}

impl Actor {
    pub fn account_id(&self) -> AccountId {
        match self {
            Actor::Manager { account_id, .. } | Actor::Customer { account_id } => *account_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Manager { .. } => Role::Manager,
            Actor::Customer { .. } => Role::Customer,
        }
    }

    /// The restaurant this actor manages, if any.
    pub fn managed_restaurant(&self) -> Option<RestaurantId> {
        match self {
            Actor::Manager { restaurant_id, .. } => Some(*restaurant_id),
            Actor::Customer { .. } => None,
        }
    }

    pub fn is_customer(&self, account_id: AccountId) -> bool {
        matches!(self, Actor::Customer { account_id: id } if *id == account_id)
    }

    pub fn manages(&self, restaurant_id: RestaurantId) -> bool {
        self.managed_restaurant() == Some(restaurant_id)
    }
}
