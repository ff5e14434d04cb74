pub mod accounts;
pub mod analytics;
pub mod auth;
pub mod evaluations;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use serde::Serialize;
use store::Page;

use crate::error::ApiError;

/// Pagination details returned with every listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page_index: usize,
    pub per_page: usize,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let meta = PageMeta {
            page_index: page.page_index,
            per_page: page.per_page,
            total_count: page.total_count,
        };
        Self {
            items: page.items.into_iter().map(f).collect(),
            meta,
        }
    }
}

/// Parses a path or query identifier.
pub(crate) fn parse_id<T>(id: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
