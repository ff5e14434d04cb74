use common::{OrderId, OrderStatus};
use serde::Serialize;

use crate::Order;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }

    /// Number of records to skip. Saturates, so a page index past the end
    /// of any result set yields an empty page.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.per_page)
    }

    /// `LIMIT` as a SQL bigint.
    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.per_page).unwrap_or(i64::MAX)
    }

    /// `OFFSET` as a SQL bigint.
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset()).unwrap_or(i64::MAX)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0)
    }
}

/// One page of results plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub per_page: usize,
    pub total_count: usize,
}

impl<T> Page<T> {
    /// Slices an already filtered and sorted result set.
    pub fn from_sorted(all: Vec<T>, page: PageRequest) -> Self {
        let total_count = all.len();
        let items = all
            .into_iter()
            .skip(page.offset())
            .take(page.per_page)
            .collect();
        Self {
            items,
            page_index: page.page_index,
            per_page: page.per_page,
            total_count,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            per_page: self.per_page,
            total_count: self.total_count,
        }
    }
}

/// Builder for filtering an order listing.
///
/// The owner scope (customer or restaurant) is chosen by the repository
/// method; this only narrows within it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Filter by current status.
    pub status: Option<OrderStatus>,

    /// Case-insensitive substring of the customer's name.
    pub customer_name: Option<String>,

    /// Filter by a single order ID.
    pub order_id: Option<OrderId>,

    pub page: PageRequest,
}

impl OrderQuery {
    /// Creates a new empty query for the first page.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn page(mut self, page_index: usize) -> Self {
        self.page = PageRequest::new(page_index);
        self
    }

    /// Returns true if the order passes every filter set on this query.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(id) = self.order_id
            && order.id != id
        {
            return false;
        }
        if let Some(ref name) = self.customer_name
            && !order
                .customer_name
                .to_lowercase()
                .contains(&name.to_lowercase())
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AccountId, Money, RestaurantId};

    fn order(name: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(),
            customer_id: AccountId::new(),
            customer_name: name.to_string(),
            restaurant_id: RestaurantId::new(),
            items: vec![],
            total: Money::zero(),
            status,
            placed_at: Utc::now(),
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(OrderQuery::new().matches(&order("Ada", OrderStatus::Cancelled)));
    }

    #[test]
    fn filters_combine() {
        let target = order("Ada Lovelace", OrderStatus::Approved);
        let query = OrderQuery::new()
            .status(OrderStatus::Approved)
            .customer_name("lovelace");
        assert!(query.matches(&target));
        assert!(!query.matches(&order("Ada Lovelace", OrderStatus::Pending)));
        assert!(!query.matches(&order("Grace Hopper", OrderStatus::Approved)));

        let by_id = OrderQuery::new().order_id(target.id);
        assert!(by_id.matches(&target));
        assert!(!by_id.matches(&order("Ada Lovelace", OrderStatus::Approved)));
    }

    #[test]
    fn page_slices_and_counts() {
        let page = Page::from_sorted((0..25).collect::<Vec<_>>(), PageRequest::new(2));
        assert_eq!(page.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.per_page, DEFAULT_PAGE_SIZE);

        let beyond = Page::from_sorted((0..5).collect::<Vec<_>>(), PageRequest::new(3));
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 5);
    }

    #[test]
    fn huge_page_index_saturates_to_an_empty_page() {
        let page = PageRequest::new(usize::MAX);
        assert_eq!(page.offset(), usize::MAX);
        assert_eq!(page.sql_offset(), i64::MAX);
        assert_eq!(page.sql_limit(), DEFAULT_PAGE_SIZE as i64);

        let sliced = Page::from_sorted((0..5).collect::<Vec<_>>(), page);
        assert!(sliced.items.is_empty());
        assert_eq!(sliced.total_count, 5);
        assert_eq!(sliced.page_index, usize::MAX);
    }
}
