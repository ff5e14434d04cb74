mod support;

use common::OrderStatus;
use domain::{DomainError, SubmitEvaluation};
use futures_util::future::join_all;
use support::Scenario;

async fn delivered() -> Scenario {
    let s = Scenario::new().await;
    let orders = &s.world.services.orders;
    orders.approve(&s.manager, s.order.id).await.unwrap();
    orders.dispatch(&s.manager, s.order.id).await.unwrap();
    orders.deliver(&s.manager, s.order.id).await.unwrap();
    s
}

#[tokio::test]
async fn customer_evaluates_delivered_order() {
    let s = delivered().await;

    let evaluation = s
        .world
        .services
        .evaluations
        .submit(
            &s.customer_token,
            s.order.id,
            SubmitEvaluation::new(5).with_comment("  Still warm  "),
        )
        .await
        .unwrap();

    assert_eq!(evaluation.rating, 5);
    assert_eq!(evaluation.comment.as_deref(), Some("Still warm"));
    assert_eq!(evaluation.restaurant_id, s.restaurant_id);
    assert_eq!(evaluation.customer_id, s.customer.id);
}

#[tokio::test]
async fn only_delivered_orders_can_be_evaluated() {
    let s = Scenario::new().await;
    let evaluations = &s.world.services.evaluations;

    let result = evaluations
        .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(4))
        .await;
    assert!(matches!(
        result,
        Err(DomainError::InvalidTransition {
            current: OrderStatus::Pending,
            ..
        })
    ));

    s.world
        .services
        .orders
        .cancel(&s.customer_token, s.order.id)
        .await
        .unwrap();
    let result = evaluations
        .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(4))
        .await;
    assert!(matches!(
        result,
        Err(DomainError::InvalidTransition {
            current: OrderStatus::Cancelled,
            ..
        })
    ));
}

#[tokio::test]
async fn second_evaluation_is_rejected() {
    let s = delivered().await;
    let evaluations = &s.world.services.evaluations;

    evaluations
        .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(3))
        .await
        .unwrap();
    let result = evaluations
        .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(5))
        .await;
    assert!(matches!(result, Err(DomainError::AlreadyExists { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_store_one_evaluation() {
    let s = delivered().await;

    let attempts = (1..=4u8).map(|rating| {
        let evaluations = s.world.services.evaluations.clone();
        let token = s.customer_token.clone();
        let order_id = s.order.id;
        tokio::spawn(async move {
            evaluations
                .submit(&token, order_id, SubmitEvaluation::new(rating))
                .await
        })
    });
    let results = join_all(attempts).await;

    let winners = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| match r {
            Ok(_) => true,
            Err(DomainError::AlreadyExists { .. }) => false,
            Err(e) => panic!("unexpected error: {e}"),
        })
        .count();
    assert_eq!(winners, 1);

    let page = s
        .world
        .services
        .evaluations
        .list_for_restaurant(&s.manager, 0)
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn only_the_owning_customer_may_evaluate() {
    let s = delivered().await;
    let (_, stranger) = s.world.customer("Grace", "grace@example.com").await;
    let evaluations = &s.world.services.evaluations;

    for token in [&stranger, &s.manager] {
        let result = evaluations
            .submit(token, s.order.id, SubmitEvaluation::new(5))
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));
    }
}

#[tokio::test]
async fn rating_and_comment_are_validated() {
    let s = delivered().await;
    let evaluations = &s.world.services.evaluations;

    for cmd in [
        SubmitEvaluation::new(0),
        SubmitEvaluation::new(6),
        SubmitEvaluation::new(5).with_comment("x".repeat(501)),
    ] {
        let result = evaluations.submit(&s.customer_token, s.order.id, cmd).await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    // Nothing was stored by the rejected attempts
    assert!(
        evaluations
            .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(1))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn manager_lists_restaurant_evaluations() {
    let s = delivered().await;
    let evaluations = &s.world.services.evaluations;
    evaluations
        .submit(&s.customer_token, s.order.id, SubmitEvaluation::new(4))
        .await
        .unwrap();

    let page = evaluations.list_for_restaurant(&s.manager, 0).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].order_id, s.order.id);

    let (_, rival) = s.world.restaurant("rival@example.com").await;
    let empty = evaluations.list_for_restaurant(&rival, 0).await.unwrap();
    assert_eq!(empty.total_count, 0);

    assert!(matches!(
        evaluations.list_for_restaurant(&s.customer_token, 0).await,
        Err(DomainError::Forbidden { .. })
    ));

    let beyond = evaluations
        .list_for_restaurant(&s.manager, usize::MAX)
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_count, 1);
}
