mod common;

use axum_ticketing_api::{
    dto::orders::CreateOrderRequest,
    error::AppError,
    models::OrderStatus,
    services::{
        order_service,
        payment_service::{self, Confirmation, ReconcileOutcome},
    },
    state::AppState,
};
use serde_json::json;
use uuid::Uuid;

use common::{attendee, seed_tier, setup_state, tickets, unique_slug};

async fn create_pending_order(state: &AppState, price: i64, qty: i32) -> anyhow::Result<Uuid> {
    let slug = unique_slug("tier");
    seed_tier(state, &slug, price, "AVAILABLE", 50, 0).await?;
    let details = order_service::create_order(
        state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, qty)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await?;
    Ok(details.order.id)
}

fn confirmation(order_id: Uuid, status: &str, amount: Option<i64>) -> Confirmation {
    Confirmation {
        order_id,
        transaction_id: "OP-123".into(),
        status: status.into(),
        amount,
        payment_result: Some(json!({ "status": status, "transactionId": "OP-123" })),
    }
}

#[tokio::test]
async fn approved_confirmation_with_matching_amount_marks_paid() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    // Subtotal 5000.00 and a confirmation for exactly "5000.00".
    let order_id = create_pending_order(&state, 500000, 1).await?;
    let amount = axum_ticketing_api::money::parse_minor("5000.00");

    let outcome =
        payment_service::reconcile(&state, confirmation(order_id, "APPROVED", amount)).await?;
    let ReconcileOutcome::Completed(order) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.paid_at.is_some());
    assert_eq!(order.payment_id.as_deref(), Some("OP-123"));

    Ok(())
}

#[tokio::test]
async fn replayed_confirmation_converges_without_side_effects() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let order_id = create_pending_order(&state, 250000, 2).await?;
    let conf = confirmation(order_id, "COMPLETED", Some(500000));

    let first = payment_service::reconcile(&state, conf.clone()).await?;
    let ReconcileOutcome::Completed(first) = first else {
        panic!("expected completed outcome");
    };

    let second = payment_service::reconcile(&state, conf).await?;
    let ReconcileOutcome::Completed(second) = second else {
        panic!("expected completed outcome on replay");
    };

    assert_eq!(second.paid_at, first.paid_at);
    assert_eq!(second.payment_id, first.payment_id);

    Ok(())
}

#[tokio::test]
async fn amount_mismatch_rejects_and_leaves_order_untouched() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let order_id = create_pending_order(&state, 500000, 1).await?;

    let err = payment_service::reconcile(&state, confirmation(order_id, "APPROVED", Some(499900)))
        .await
        .expect_err("mismatched amount must be rejected");
    assert!(matches!(err, AppError::AmountMismatch));

    let details = order_service::get_order(&state, order_id).await?;
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert!(details.order.paid_at.is_none());

    Ok(())
}

#[tokio::test]
async fn non_approved_status_is_reported_not_applied() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let order_id = create_pending_order(&state, 500000, 1).await?;

    let outcome =
        payment_service::reconcile(&state, confirmation(order_id, "DECLINED", Some(500000)))
            .await?;
    let ReconcileOutcome::NotApproved(status) = outcome else {
        panic!("expected not-approved outcome");
    };
    assert_eq!(status, "DECLINED");

    let details = order_service::get_order(&state, order_id).await?;
    assert_eq!(details.order.status, OrderStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn confirmation_without_amount_is_accepted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let order_id = create_pending_order(&state, 250000, 1).await?;

    let outcome = payment_service::reconcile(&state, confirmation(order_id, "SUCCESS", None)).await?;
    assert!(matches!(outcome, ReconcileOutcome::Completed(_)));

    Ok(())
}

#[tokio::test]
async fn confirmation_for_unknown_order_is_not_found() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let err = payment_service::reconcile(
        &state,
        confirmation(Uuid::new_v4(), "APPROVED", Some(500000)),
    )
    .await
    .expect_err("unknown order must be rejected");
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}
