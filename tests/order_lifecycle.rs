mod common;

use axum_ticketing_api::{
    dto::orders::CreateOrderRequest,
    entity::{discount_codes::Entity as DiscountCodes, orders, ticket_tiers::Entity as TicketTiers},
    error::{AppError, DiscountInvalidReason},
    models::OrderStatus,
    services::order_service,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tokio::task::JoinSet;
use uuid::Uuid;

use common::{attendee, seed_code, seed_tier, setup_state, tickets, unique_code, unique_slug};

#[tokio::test]
async fn create_order_reserves_inventory_and_applies_discount() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("alpha");
    let tier = seed_tier(&state, &slug, 200000, "AVAILABLE", 100, 0).await?;
    let code = unique_code("PCT");
    seed_code(&state, &code, "PERCENTAGE", 26, Some(100), Some(tier.id)).await?;

    let details = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, 2)]),
            attendee: attendee(),
            discount_code: Some(code.to_lowercase()),
        },
    )
    .await?;

    let order = &details.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal_amount, 400000);
    assert_eq!(order.discount_amount, 104000);
    assert_eq!(order.total_amount, 296000);
    assert!(order.expires_at > Utc::now());
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].quantity, 2);
    assert_eq!(details.items[0].unit_price, 200000);
    assert_eq!(
        details.attendee.as_ref().map(|a| a.email.as_str()),
        Some("ada@example.com")
    );
    assert_eq!(
        details.discount_code.as_ref().map(|c| c.code.as_str()),
        Some(code.as_str())
    );

    let tier = TicketTiers::find_by_id(tier.id)
        .one(&state.orm)
        .await?
        .expect("tier");
    assert_eq!(tier.sold_quantity, 2);

    let code = DiscountCodes::find_by_id(details.order.discount_code_id.expect("code id"))
        .one(&state.orm)
        .await?
        .expect("code");
    assert_eq!(code.current_uses, 1);

    Ok(())
}

#[tokio::test]
async fn tier_restricted_discount_fails_order_without_reserving() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let alpha = seed_tier(&state, &unique_slug("alpha"), 200000, "AVAILABLE", 100, 0).await?;
    let beta_slug = unique_slug("beta");
    let beta = seed_tier(&state, &beta_slug, 250000, "AVAILABLE", 200, 0).await?;
    let code = unique_code("REP");
    seed_code(&state, &code, "PERCENTAGE", 26, Some(100), Some(alpha.id)).await?;

    let err = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&beta_slug, 2)]),
            attendee: attendee(),
            discount_code: Some(code),
        },
    )
    .await
    .expect_err("tier-restricted code must fail the order");
    assert!(matches!(
        err,
        AppError::DiscountInvalid(DiscountInvalidReason::TierRestricted)
    ));

    // The whole transaction rolled back: nothing reserved, nothing redeemed.
    let beta = TicketTiers::find_by_id(beta.id)
        .one(&state.orm)
        .await?
        .expect("tier");
    assert_eq!(beta.sold_quantity, 0);

    Ok(())
}

#[tokio::test]
async fn rejects_unknown_unavailable_and_oversold_tiers() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let scarce_slug = unique_slug("scarce");
    seed_tier(&state, &scarce_slug, 100000, "AVAILABLE", 5, 4).await?;
    let err = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&scarce_slug, 2)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await
    .expect_err("overselling must fail");
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let coming_slug = unique_slug("coming");
    seed_tier(&state, &coming_slug, 100000, "COMING_SOON", 100, 0).await?;
    let err = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&coming_slug, 1)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await
    .expect_err("tier not on sale must fail");
    assert!(matches!(err, AppError::TierUnavailable(_)));

    let err = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&unique_slug("ghost"), 1)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await
    .expect_err("unknown slug must fail");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn cancel_returns_inventory_exactly_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("beta");
    let tier = seed_tier(&state, &slug, 250000, "AVAILABLE", 50, 0).await?;

    let details = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, 3)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await?;
    let order_id = details.order.id;

    let sold = tier_sold(&state, tier.id).await?;
    assert_eq!(sold, 3);

    let cancelled = order_service::cancel_order(&state, order_id).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(tier_sold(&state, tier.id).await?, 0);

    // Only tier counters move; the order's items keep their quantities.
    let details = order_service::get_order(&state, order_id).await?;
    assert_eq!(details.items[0].quantity, 3);

    // Idempotent: a second cancel succeeds and releases nothing further.
    let again = order_service::cancel_order(&state, order_id).await?;
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(tier_sold(&state, tier.id).await?, 0);

    // A payment for a cancelled order is rejected.
    let err = order_service::mark_paid(&state, order_id, "TX-1", "PagueloFacil", None)
        .await
        .expect_err("paying a cancelled order must fail");
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn mark_paid_is_idempotent_under_replay() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("beta");
    seed_tier(&state, &slug, 250000, "AVAILABLE", 50, 0).await?;
    let details = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, 1)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await?;
    let order_id = details.order.id;

    let moved = order_service::move_to_awaiting_payment(&state, order_id).await?;
    assert_eq!(moved.status, OrderStatus::AwaitingPayment);

    let first = order_service::mark_paid(&state, order_id, "TX-9", "PagueloFacil", None).await?;
    assert_eq!(first.status, OrderStatus::Paid);
    let paid_at = first.paid_at.expect("paid_at set");

    let second = order_service::mark_paid(&state, order_id, "TX-9", "PagueloFacil", None).await?;
    assert_eq!(second.status, OrderStatus::Paid);
    assert_eq!(second.paid_at, Some(paid_at));
    assert_eq!(second.payment_id.as_deref(), Some("TX-9"));

    // Cancel after payment is rejected.
    let err = order_service::cancel_order(&state, order_id)
        .await
        .expect_err("cancelling a paid order must fail");
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn expiry_releases_inventory_and_blocks_late_payment() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("beta");
    let tier = seed_tier(&state, &slug, 250000, "AVAILABLE", 50, 0).await?;
    let details = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, 2)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await?;
    let order_id = details.order.id;

    // Not yet lapsed: expire refuses.
    let err = order_service::expire_order(&state, order_id)
        .await
        .expect_err("fresh order must not expire");
    assert!(matches!(err, AppError::NotYetExpired));

    backdate_expiry(&state, order_id).await?;

    let expired = order_service::expire_order(&state, order_id).await?;
    assert_eq!(expired.status, OrderStatus::Expired);
    assert_eq!(tier_sold(&state, tier.id).await?, 0);

    // Expire again: terminal no-op, nothing released twice.
    let again = order_service::expire_order(&state, order_id).await?;
    assert_eq!(again.status, OrderStatus::Expired);
    assert_eq!(tier_sold(&state, tier.id).await?, 0);

    let err = order_service::mark_paid(&state, order_id, "TX-LATE", "PagueloFacil", None)
        .await
        .expect_err("paying an expired order must fail");
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn sweep_expires_only_lapsed_orders() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("beta");
    seed_tier(&state, &slug, 250000, "AVAILABLE", 50, 0).await?;

    let mut lapsed_ids = Vec::new();
    for _ in 0..2 {
        let details = order_service::create_order(
            &state,
            CreateOrderRequest {
                tickets: tickets(&[(&slug, 1)]),
                attendee: attendee(),
                discount_code: None,
            },
        )
        .await?;
        backdate_expiry(&state, details.order.id).await?;
        lapsed_ids.push(details.order.id);
    }
    let fresh = order_service::create_order(
        &state,
        CreateOrderRequest {
            tickets: tickets(&[(&slug, 1)]),
            attendee: attendee(),
            discount_code: None,
        },
    )
    .await?;

    order_service::sweep_expired(&state).await?;

    for id in lapsed_ids {
        let order = order_service::get_order(&state, id).await?;
        assert_eq!(order.order.status, OrderStatus::Expired);
    }
    let fresh = order_service::get_order(&state, fresh.order.id).await?;
    assert_eq!(fresh.order.status, OrderStatus::Pending);

    Ok(())
}

// N concurrent buyers against M seats: exactly M orders succeed and the
// counter never passes the capacity.
#[tokio::test]
async fn concurrent_reservations_never_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let slug = unique_slug("last-seats");
    let tier = seed_tier(&state, &slug, 100000, "AVAILABLE", 5, 0).await?;

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let state = state.clone();
        let slug = slug.clone();
        tasks.spawn(async move {
            order_service::create_order(
                &state,
                CreateOrderRequest {
                    tickets: tickets(&[(&slug, 1)]),
                    attendee: attendee(),
                    discount_code: None,
                },
            )
            .await
        });
    }

    let mut created = 0;
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result? {
            Ok(_) => created += 1,
            Err(AppError::InsufficientStock(_)) => rejected += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(created, 5);
    assert_eq!(rejected, 3);
    assert_eq!(tier_sold(&state, tier.id).await?, 5);

    Ok(())
}

// Two buyers racing for a single-use code: exactly one redemption.
#[tokio::test]
async fn concurrent_redemption_of_single_use_code() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    // Separate tiers so the orders do not serialize on inventory locks.
    let slug_a = unique_slug("race-a");
    let slug_b = unique_slug("race-b");
    seed_tier(&state, &slug_a, 100000, "AVAILABLE", 10, 0).await?;
    seed_tier(&state, &slug_b, 100000, "AVAILABLE", 10, 0).await?;
    let code = unique_code("ONCE");
    let code_row = seed_code(&state, &code, "FIXED", 5000, Some(1), None).await?;

    let mut tasks = JoinSet::new();
    for slug in [slug_a, slug_b] {
        let state = state.clone();
        let code = code.clone();
        tasks.spawn(async move {
            order_service::create_order(
                &state,
                CreateOrderRequest {
                    tickets: tickets(&[(&slug, 1)]),
                    attendee: attendee(),
                    discount_code: Some(code),
                },
            )
            .await
        });
    }

    let mut succeeded = 0;
    let mut exhausted = 0;
    while let Some(result) = tasks.join_next().await {
        match result? {
            Ok(_) => succeeded += 1,
            Err(AppError::DiscountInvalid(DiscountInvalidReason::Exhausted)) => exhausted += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(exhausted, 1);

    let code_row = DiscountCodes::find_by_id(code_row.id)
        .one(&state.orm)
        .await?
        .expect("code");
    assert_eq!(code_row.current_uses, 1);

    Ok(())
}

async fn tier_sold(
    state: &axum_ticketing_api::state::AppState,
    tier_id: Uuid,
) -> anyhow::Result<i32> {
    let tier = TicketTiers::find_by_id(tier_id)
        .one(&state.orm)
        .await?
        .expect("tier");
    Ok(tier.sold_quantity)
}

async fn backdate_expiry(
    state: &axum_ticketing_api::state::AppState,
    order_id: Uuid,
) -> anyhow::Result<()> {
    let order = orders::Entity::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order");
    let mut active: orders::ActiveModel = order.into();
    active.expires_at = Set((Utc::now() - Duration::minutes(20)).into());
    active.update(&state.orm).await?;
    Ok(())
}
