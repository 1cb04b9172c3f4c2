//! Payment reconciliation: outbound payment-link requests and inbound
//! confirmation handling.
//!
//! The provider call is the only network hop in the core; it runs outside
//! any database transaction and a provider failure leaves the order
//! untouched. Reconciliation is idempotent under replay because it ends in
//! `order_service::mark_paid`.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::Entity as Orders,
        ticket_tiers::Entity as TicketTiers,
    },
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
    money,
    paguelofacil::{self, LinkRequest},
    services::order_service,
    state::AppState,
};

pub const PAYMENT_METHOD: &str = "PagueloFacil";

/// Payment links are valid for an hour on the provider side; the order's
/// own reservation window is enforced separately by the expiry sweep.
const LINK_EXPIRES_IN_SECS: u32 = 3600;

const DESCRIPTION_MAX: usize = 255;

/// A normalized external payment confirmation, from either the webhook or
/// the browser redirect.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub order_id: Uuid,
    pub transaction_id: String,
    pub status: String,
    /// Amount paid in minor units, when the channel reports one.
    pub amount: Option<i64>,
    /// Raw provider payload, stored on the order as the payment result.
    pub payment_result: Option<Value>,
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The order is PAID (first delivery or an idempotent replay).
    Completed(Order),
    /// The provider reported a non-approved status; nothing was changed.
    NotApproved(String),
}

/// Ask the provider for a hosted payment link for this order.
///
/// On success the provider's correlation token and payload are stored on
/// the order and a PENDING order advances to AWAITING_PAYMENT. On provider
/// rejection or network failure the order is left unmodified and the
/// provider's message is surfaced.
pub async fn request_payment_link(state: &AppState, order_id: Uuid) -> AppResult<String> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    match OrderStatus::parse(&order.status) {
        Some(OrderStatus::Paid) => {
            return Err(AppError::InvalidState("Order is already paid".into()));
        }
        Some(OrderStatus::Cancelled) | Some(OrderStatus::Expired) => {
            return Err(AppError::InvalidState("Order is no longer valid".into()));
        }
        Some(OrderStatus::Pending) | Some(OrderStatus::AwaitingPayment) => {}
        None => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "unknown order status {:?}",
                order.status
            )));
        }
    }

    let description = build_description(state, order_id).await?;

    let link = state
        .payments
        .create_payment_link(LinkRequest {
            amount: order.total_amount,
            description: &description,
            expires_in_secs: LINK_EXPIRES_IN_SECS,
        })
        .await?;

    order_service::record_payment_link(state, order_id, link.token, PAYMENT_METHOD, link.raw)
        .await?;

    Ok(link.url)
}

/// Apply an external confirmation to its order.
///
/// Non-approved statuses are reported, not applied. Approved confirmations
/// carrying an amount must match the order total exactly before the PAID
/// transition runs. Replays of the same confirmation converge on the same
/// outcome with no extra side effects.
pub async fn reconcile(state: &AppState, confirmation: Confirmation) -> AppResult<ReconcileOutcome> {
    if !paguelofacil::is_approved_status(&confirmation.status) {
        return Ok(ReconcileOutcome::NotApproved(confirmation.status));
    }

    if let Some(amount) = confirmation.amount {
        let order = Orders::find_by_id(confirmation.order_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        if amount != order.total_amount {
            return Err(AppError::AmountMismatch);
        }
    }

    let order = order_service::mark_paid(
        state,
        confirmation.order_id,
        &confirmation.transaction_id,
        PAYMENT_METHOD,
        confirmation.payment_result,
    )
    .await?;

    Ok(ReconcileOutcome::Completed(order))
}

async fn build_description(state: &AppState, order_id: Uuid) -> AppResult<String> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .find_also_related(TicketTiers)
        .all(&state.orm)
        .await?;

    let lines: Vec<String> = items
        .into_iter()
        .map(|(item, tier)| {
            let name = tier.map(|t| t.name).unwrap_or_default();
            format!(
                "{} x{} @ {}",
                name,
                item.quantity,
                money::format_minor(item.unit_price)
            )
        })
        .collect();

    Ok(truncate(
        &format!("Purchase of the tickets: {}", lines.join(", ")),
        DESCRIPTION_MAX,
    ))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("short", 255), "short");
        let long = "a".repeat(300);
        assert_eq!(truncate(&long, 255).len(), 255);
        // Multi-byte char straddling the cut is dropped whole.
        let s = format!("{}é", "a".repeat(254));
        assert_eq!(truncate(&s, 255), "a".repeat(254));
    }
}
