//! Inputs for order operations.

use common::{ProductId, RestaurantId};

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place a new order with a restaurant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub restaurant_id: RestaurantId,
    pub items: Vec<OrderItemRequest>,
}

impl PlaceOrder {
    pub fn new(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id,
            items: Vec::new(),
        }
    }

    /// Adds a line to the order being built.
    pub fn item(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(OrderItemRequest::new(product_id, quantity));
        self
    }

    /// Merges lines for the same product, keeping first-seen order.
    pub(crate) fn merged_items(&self) -> Vec<OrderItemRequest> {
        let mut merged: Vec<OrderItemRequest> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => merged.push(*item),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_lines_merge() {
        let pizza = ProductId::new();
        let soda = ProductId::new();
        let cmd = PlaceOrder::new(RestaurantId::new())
            .item(pizza, 1)
            .item(soda, 2)
            .item(pizza, 3);

        let merged = cmd.merged_items();
        assert_eq!(merged, vec![
            OrderItemRequest::new(pizza, 4),
            OrderItemRequest::new(soda, 2)
        ]);
    }
}
