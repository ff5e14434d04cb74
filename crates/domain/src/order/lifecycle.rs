//! The order lifecycle engine.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{Money, OrderId, OrderStatus, Role};
use store::{Order, OrderLine, OrderQuery, Page, Store};

use super::{PlaceOrder, Transition};
use crate::{Actor, DomainError, SessionAuthenticator, deadline::within};

/// A transition that passed authentication, authorization and the
/// precondition check, and has not yet been committed.
///
/// Nothing is written until [`OrderLifecycle::commit`]; dropping a prepared
/// transition has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedTransition {
    order_id: OrderId,
    transition: Transition,
    expected: OrderStatus,
    actor: Actor,
}

impl PreparedTransition {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// The status the order had when it was checked.
    pub fn expected(&self) -> OrderStatus {
        self.expected
    }

    pub fn actor(&self) -> Actor {
        self.actor
    }
}

/// Places orders and moves them through their lifecycle.
///
/// Every transition runs the same steps: authenticate the caller, load the
/// order, check role and ownership, check the current status, then commit
/// with a compare-and-swap on that status. Only the last step writes, and a
/// lost race surfaces as [`DomainError::Conflict`]. Transitions are never
/// retried here.
#[derive(Clone)]
pub struct OrderLifecycle<S> {
    store: S,
    sessions: SessionAuthenticator<S>,
    timeout: Duration,
}

impl<S: Store + Clone> OrderLifecycle<S> {
    pub fn new(store: S, sessions: SessionAuthenticator<S>, timeout: Duration) -> Self {
        Self {
            store,
            sessions,
            timeout,
        }
    }

    /// Places an order for the calling customer.
    ///
    /// Line items are copied from the restaurant's current menu.
    #[tracing::instrument(skip(self, token))]
    pub async fn place_order(&self, token: &str, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let customer = self.sessions.validate(token).await?;
        if customer.role() != Role::Customer {
            return Err(DomainError::Forbidden {
                action: "place orders",
            });
        }

        let requested = cmd.merged_items();
        if requested.is_empty() {
            return Err(DomainError::invalid("an order needs at least one item"));
        }
        if requested.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::invalid("item quantities must be at least 1"));
        }

        within(
            self.timeout,
            "restaurants.get",
            self.store.get_restaurant(cmd.restaurant_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found("Restaurant", cmd.restaurant_id))?;

        let menu = within(
            self.timeout,
            "products.list",
            self.store.list_products(cmd.restaurant_id),
        )
        .await?;
        let menu: HashMap<_, _> = menu.into_iter().map(|p| (p.id, p)).collect();

        let items = requested
            .iter()
            .map(|item| {
                let product = menu.get(&item.product_id).ok_or_else(|| {
                    DomainError::invalid(format!(
                        "product {} is not on this restaurant's menu",
                        item.product_id
                    ))
                })?;
                Ok(OrderLine {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    quantity: item.quantity,
                    unit_price: product.price,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let total = items
            .iter()
            .try_fold(Money::zero(), |acc, line| {
                line.checked_total_price()
                    .and_then(|line_total| acc.checked_add(line_total))
            })
            .ok_or_else(|| DomainError::invalid("order total is too large"))?;

        let order = Order {
            id: OrderId::new(),
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            restaurant_id: cmd.restaurant_id,
            total,
            items,
            status: OrderStatus::Pending,
            placed_at: Utc::now(),
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
        };

        within(
            self.timeout,
            "orders.create",
            self.store.create_order(order.clone()),
        )
        .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// Approves a pending order. Restaurant manager only.
    pub async fn approve(&self, token: &str, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(token, order_id, Transition::Approve).await
    }

    /// Cancels a pending or approved order. Owning customer or restaurant
    /// manager.
    pub async fn cancel(&self, token: &str, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(token, order_id, Transition::Cancel).await
    }

    /// Marks an approved order as dispatched. Restaurant manager only.
    pub async fn dispatch(&self, token: &str, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(token, order_id, Transition::Dispatch).await
    }

    /// Marks a dispatched order as delivered. Restaurant manager only.
    pub async fn deliver(&self, token: &str, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(token, order_id, Transition::Deliver).await
    }

    /// Runs one transition from start to commit.
    #[tracing::instrument(skip(self, token))]
    pub async fn transition(
        &self,
        token: &str,
        order_id: OrderId,
        transition: Transition,
    ) -> Result<Order, DomainError> {
        let start = Instant::now();

        let result = match self.prepare(token, order_id, transition).await {
            Ok(prepared) => self.commit(prepared).await,
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "committed",
            Err(DomainError::Conflict { .. }) => "conflict",
            Err(e) if e.is_internal() => "error",
            Err(_) => "rejected",
        };
        metrics::counter!(
            "order_transitions_total",
            "transition" => transition.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "order_transition_duration_seconds",
            "transition" => transition.as_str()
        )
        .record(start.elapsed().as_secs_f64());

        result
    }

    /// Runs every check of a transition without writing anything.
    ///
    /// Authorization is checked before the precondition, so a caller with
    /// no rights over the order learns nothing about its status.
    pub async fn prepare(
        &self,
        token: &str,
        order_id: OrderId,
        transition: Transition,
    ) -> Result<PreparedTransition, DomainError> {
        let actor = self.sessions.authenticate(token).await?;
        let order = self.load(order_id).await?;

        transition.authorize(&actor, &order)?;
        transition.check_precondition(order.status)?;

        Ok(PreparedTransition {
            order_id,
            transition,
            expected: order.status,
            actor,
        })
    }

    /// Commits a prepared transition.
    ///
    /// Succeeds only if the order still has the status it had when it was
    /// prepared; otherwise fails with `Conflict`.
    pub async fn commit(&self, prepared: PreparedTransition) -> Result<Order, DomainError> {
        let order = within(
            self.timeout,
            "orders.update_status",
            self.store.update_status(
                prepared.order_id,
                prepared.expected,
                prepared.transition.target(),
                Utc::now(),
            ),
        )
        .await
        .inspect_err(|e| {
            if let DomainError::Conflict { actual, .. } = e {
                tracing::info!(
                    order_id = %prepared.order_id,
                    transition = %prepared.transition,
                    %actual,
                    "Transition lost a concurrent update"
                );
            }
        })?;

        tracing::info!(
            order_id = %order.id,
            transition = %prepared.transition,
            from = %prepared.expected,
            to = %order.status,
            actor = %prepared.actor.account_id(),
            "Order transitioned"
        );
        Ok(order)
    }

    /// Returns one order, if the caller placed it or manages its restaurant.
    pub async fn get_order(&self, token: &str, order_id: OrderId) -> Result<Order, DomainError> {
        let actor = self.sessions.authenticate(token).await?;
        let order = self.load(order_id).await?;

        if actor.is_customer(order.customer_id) || actor.manages(order.restaurant_id) {
            Ok(order)
        } else {
            Err(DomainError::Forbidden {
                action: "view this order",
            })
        }
    }

    /// Lists the caller's orders: a customer's own, or every order of a
    /// manager's restaurant.
    pub async fn list_orders(
        &self,
        token: &str,
        query: OrderQuery,
    ) -> Result<Page<Order>, DomainError> {
        let actor = self.sessions.authenticate(token).await?;

        match actor {
            Actor::Customer { account_id } => {
                within(
                    self.timeout,
                    "orders.list_for_customer",
                    self.store.list_for_customer(account_id, &query),
                )
                .await
            }
            Actor::Manager { restaurant_id, .. } => {
                within(
                    self.timeout,
                    "orders.list_for_restaurant",
                    self.store.list_for_restaurant(restaurant_id, &query),
                )
                .await
            }
        }
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, DomainError> {
        within(self.timeout, "orders.get", self.store.get_order(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }
}
