//! Ratings on delivered orders.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::Utc;
use common::{EvaluationId, OrderId, OrderStatus};
use store::{Evaluation, Page, PageRequest, Store};

use crate::{Actor, DomainError, SessionAuthenticator, deadline::within};

pub const RATING_RANGE: RangeInclusive<u8> = 1..=5;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Command to evaluate a delivered order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitEvaluation {
    pub rating: u8,
    pub comment: Option<String>,
}

impl SubmitEvaluation {
    pub fn new(rating: u8) -> Self {
        Self {
            rating,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Clone)]
pub struct EvaluationManager<S> {
    store: S,
    sessions: SessionAuthenticator<S>,
    timeout: Duration,
}

impl<S: Store + Clone> EvaluationManager<S> {
    pub fn new(store: S, sessions: SessionAuthenticator<S>, timeout: Duration) -> Self {
        Self {
            store,
            sessions,
            timeout,
        }
    }

    /// Attaches the owning customer's evaluation to a delivered order.
    ///
    /// At most one evaluation exists per order. The store's uniqueness rule
    /// decides between concurrent submissions, not a prior lookup.
    #[tracing::instrument(skip(self, token))]
    pub async fn submit(
        &self,
        token: &str,
        order_id: OrderId,
        cmd: SubmitEvaluation,
    ) -> Result<Evaluation, DomainError> {
        let actor = self.sessions.authenticate(token).await?;
        let order = within(self.timeout, "orders.get", self.store.get_order(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if !actor.is_customer(order.customer_id) {
            return Err(DomainError::Forbidden {
                action: "evaluate this order",
            });
        }
        if order.status != OrderStatus::Delivered {
            return Err(DomainError::InvalidTransition {
                action: "evaluate",
                current: order.status,
            });
        }
        if !RATING_RANGE.contains(&cmd.rating) {
            return Err(DomainError::invalid(format!(
                "rating must be between {} and {}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )));
        }
        let comment = normalize_comment(cmd.comment)?;

        let evaluation = Evaluation {
            id: EvaluationId::new(),
            order_id,
            restaurant_id: order.restaurant_id,
            customer_id: order.customer_id,
            rating: cmd.rating,
            comment,
            created_at: Utc::now(),
        };

        within(
            self.timeout,
            "evaluations.insert",
            self.store.insert_evaluation(evaluation.clone()),
        )
        .await?;

        metrics::counter!("evaluations_submitted_total").increment(1);
        tracing::info!(%order_id, rating = evaluation.rating, "Evaluation submitted");
        Ok(evaluation)
    }

    /// Lists the evaluations of the caller's restaurant, newest first.
    pub async fn list_for_restaurant(
        &self,
        token: &str,
        page_index: usize,
    ) -> Result<Page<Evaluation>, DomainError> {
        let Actor::Manager { restaurant_id, .. } = self.sessions.authenticate(token).await? else {
            return Err(DomainError::Forbidden {
                action: "list restaurant evaluations",
            });
        };

        within(
            self.timeout,
            "evaluations.list",
            self.store
                .list_restaurant_evaluations(restaurant_id, PageRequest::new(page_index)),
        )
        .await
    }
}

fn normalize_comment(comment: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(comment) = comment else {
        return Ok(None);
    };
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(DomainError::invalid(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_trimmed_and_bounded() {
        assert_eq!(normalize_comment(None).unwrap(), None);
        assert_eq!(normalize_comment(Some("   ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_comment(Some("  tasty ".to_string())).unwrap(),
            Some("tasty".to_string())
        );
        assert!(normalize_comment(Some("x".repeat(MAX_COMMENT_CHARS))).is_ok());
        assert!(matches!(
            normalize_comment(Some("x".repeat(MAX_COMMENT_CHARS + 1))),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
