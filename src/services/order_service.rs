//! The order engine: creation, the lifecycle state machine and reads.
//!
//! State machine: PENDING -> AWAITING_PAYMENT -> PAID, with CANCELLED and
//! EXPIRED reachable from either live state. PAID, CANCELLED and EXPIRED
//! are terminal. Transitions run inside a transaction holding a row lock
//! on the order, so concurrent webhook deliveries and expiry sweeps
//! serialize per order.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderItemView, OrderWithDetails},
    entity::{
        attendees::{ActiveModel as AttendeeActive, Column as AttendeeCol, Entity as Attendees},
        discount_codes::Entity as DiscountCodes,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        ticket_tiers::Entity as TicketTiers,
    },
    error::{AppError, AppResult},
    models::{Attendee, DiscountCodeView, DiscountType, Order, OrderStatus},
    response::Meta,
    routes::params::{OrderListQuery, SortOrder},
    services::{discount_service, tier_service},
    state::AppState,
};

/// Create an order: resolve and lock tiers, reserve inventory, validate and
/// redeem the discount code, then persist order + items + attendee. One
/// transaction; any failure rolls the whole thing back.
pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<OrderWithDetails> {
    if payload.tickets.values().any(|qty| *qty < 0) {
        return Err(AppError::BadRequest("Ticket quantity must be positive".into()));
    }

    let selections: HashMap<&str, i32> = payload
        .tickets
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .map(|(slug, qty)| (slug.as_str(), *qty))
        .collect();
    if selections.is_empty() {
        return Err(AppError::BadRequest("No tickets selected".into()));
    }
    let slugs: Vec<String> = selections.keys().map(|s| s.to_string()).collect();

    let txn = state.orm.begin().await?;

    let tiers = tier_service::lock_tiers_by_slug(&txn, &slugs).await?;
    if tiers.len() != slugs.len() {
        let found: HashSet<&str> = tiers.iter().map(|t| t.slug.as_str()).collect();
        let missing = slugs
            .iter()
            .find(|slug| !found.contains(slug.as_str()))
            .cloned()
            .unwrap_or_default();
        return Err(AppError::BadRequest(format!(
            "Unknown ticket tier \"{missing}\""
        )));
    }

    let mut subtotal: i64 = 0;
    let mut item_plans: Vec<(Uuid, i32, i64, i64)> = Vec::new();
    for tier in &tiers {
        let quantity = selections.get(tier.slug.as_str()).copied().unwrap_or(0);
        tier_service::reserve(&txn, tier, quantity).await?;
        let total_price = tier.price * i64::from(quantity);
        subtotal += total_price;
        item_plans.push((tier.id, quantity, tier.price, total_price));
    }

    let tier_ids: Vec<Uuid> = tiers.iter().map(|t| t.id).collect();
    let mut discount_amount: i64 = 0;
    let mut discount: Option<discount_service::ValidatedDiscount> = None;
    if let Some(code) = payload
        .discount_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
    {
        // An invalid code fails the whole order; a bad code is never
        // silently dropped.
        let validated = discount_service::validate_code(&txn, code, &tier_ids).await?;
        discount_amount =
            discount_service::calculate(subtotal, validated.discount_type, validated.discount_value);
        discount_service::redeem(&txn, validated.id).await?;
        discount = Some(validated);
    }

    let total_amount = subtotal - discount_amount;
    let expires_at = Utc::now() + Duration::minutes(state.config.reservation_window_minutes);
    let currency = tiers
        .first()
        .map(|t| t.currency.clone())
        .unwrap_or_else(|| "USD".to_string());

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        status: Set(OrderStatus::Pending.as_str().to_owned()),
        subtotal_amount: Set(subtotal),
        discount_amount: Set(discount_amount),
        total_amount: Set(total_amount),
        currency: Set(currency),
        discount_code_id: Set(discount.as_ref().map(|d| d.id)),
        payment_id: Set(None),
        payment_method: Set(None),
        payment_result: Set(None),
        expires_at: Set(expires_at.into()),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (tier_id, quantity, unit_price, total_price) in item_plans {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            ticket_tier_id: Set(tier_id),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            total_price: Set(total_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let attendee = payload.attendee;
    AttendeeActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        name: Set(attendee.name),
        email: Set(attendee.email),
        country: Set(attendee.country),
        job_title: Set(attendee.job_title),
        company: Set(attendee.company),
        industry: Set(attendee.industry),
        org_type: Set(attendee.org_type),
        cncf_consent: Set(attendee.cncf_consent),
        whatsapp_updates: Set(attendee.whatsapp_updates),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit(
        state,
        "order_created",
        order.id,
        Some(serde_json::json!({ "total_amount": total_amount })),
    )
    .await;

    get_order(state, order.id).await
}

/// PENDING -> AWAITING_PAYMENT. Illegal from anywhere else.
pub async fn move_to_awaiting_payment(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let status = parse_status(&order)?;

    if status != OrderStatus::Pending {
        return Err(AppError::InvalidState("Order is not in pending state".into()));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::AwaitingPayment.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit(state, "order_awaiting_payment", order_id, None).await;

    order_from_entity(order)
}

/// Store the provider's link correlation data on the order and advance
/// PENDING -> AWAITING_PAYMENT. Allowed again from AWAITING_PAYMENT so a
/// buyer can request a fresh link; rejected once the order is terminal.
pub async fn record_payment_link(
    state: &AppState,
    order_id: Uuid,
    token: Option<String>,
    payment_method: &str,
    payment_result: Value,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let status = parse_status(&order)?;

    match status {
        OrderStatus::Paid => {
            return Err(AppError::InvalidState("Order is already paid".into()));
        }
        OrderStatus::Cancelled | OrderStatus::Expired => {
            return Err(AppError::InvalidState("Order is no longer valid".into()));
        }
        OrderStatus::Pending | OrderStatus::AwaitingPayment => {}
    }

    let mut active: OrderActive = order.into();
    active.payment_id = Set(token);
    active.payment_method = Set(Some(payment_method.to_owned()));
    active.payment_result = Set(Some(payment_result));
    if status == OrderStatus::Pending {
        active.status = Set(OrderStatus::AwaitingPayment.as_str().to_owned());
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit(state, "payment_link_created", order_id, None).await;

    order_from_entity(order)
}

/// Transition to PAID exactly once.
///
/// Idempotent: an already-PAID order is success with no field rewritten,
/// so replayed webhook deliveries cannot corrupt `paid_at` or the stored
/// payment payload. A CANCELLED or EXPIRED order rejects the payment.
pub async fn mark_paid(
    state: &AppState,
    order_id: Uuid,
    payment_id: &str,
    payment_method: &str,
    payment_result: Option<Value>,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let status = parse_status(&order)?;

    match status {
        OrderStatus::Paid => {
            txn.commit().await?;
            return order_from_entity(order);
        }
        OrderStatus::Cancelled | OrderStatus::Expired => {
            return Err(AppError::InvalidState("Order is no longer valid".into()));
        }
        OrderStatus::Pending | OrderStatus::AwaitingPayment => {}
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Paid.as_str().to_owned());
    active.payment_id = Set(Some(payment_id.to_owned()));
    active.payment_method = Set(Some(payment_method.to_owned()));
    if let Some(result) = payment_result {
        active.payment_result = Set(Some(result));
    }
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit(state, "order_paid", order_id, None).await;

    order_from_entity(order)
}

/// Cancel a live order, returning its reserved quantities to the tiers.
///
/// Already-CANCELLED is an idempotent success. PAID and EXPIRED are
/// rejected: a paid order cannot be cancelled here, and an expired order
/// already released its inventory.
pub async fn cancel_order(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let status = parse_status(&order)?;

    match status {
        OrderStatus::Paid => {
            return Err(AppError::InvalidState("Cannot cancel a paid order".into()));
        }
        OrderStatus::Cancelled => {
            txn.commit().await?;
            return order_from_entity(order);
        }
        OrderStatus::Expired => {
            return Err(AppError::InvalidState("Order is no longer valid".into()));
        }
        OrderStatus::Pending | OrderStatus::AwaitingPayment => {}
    }

    release_items(&txn, order_id).await?;

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit(state, "order_cancelled", order_id, None).await;

    order_from_entity(order)
}

/// Expire a lapsed order, returning inventory like cancellation does.
///
/// Terminal orders no-op: a sweep racing a payment confirmation sees PAID
/// and succeeds without touching anything. The deadline is re-checked
/// under the row lock, so a not-yet-lapsed order is never expired.
pub async fn expire_order(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let status = parse_status(&order)?;

    if status.is_terminal() {
        txn.commit().await?;
        return order_from_entity(order);
    }

    if Utc::now() <= order.expires_at.with_timezone(&Utc) {
        return Err(AppError::NotYetExpired);
    }

    release_items(&txn, order_id).await?;

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Expired.as_str().to_owned());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit(state, "order_expired", order_id, None).await;

    order_from_entity(order)
}

/// Expire every PENDING/AWAITING_PAYMENT order whose window lapsed.
/// Each order gets its own transaction; one stubborn order does not stall
/// the sweep, and races with in-flight payments resolve per order.
pub async fn sweep_expired(state: &AppState) -> AppResult<u64> {
    let lapsed: Vec<Uuid> = Orders::find()
        .filter(
            Condition::all()
                .add(
                    OrderCol::Status.is_in([
                        OrderStatus::Pending.as_str(),
                        OrderStatus::AwaitingPayment.as_str(),
                    ]),
                )
                .add(OrderCol::ExpiresAt.lt(Utc::now())),
        )
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();

    let mut expired = 0u64;
    for order_id in lapsed {
        match expire_order(state, order_id).await {
            Ok(order) if order.status == OrderStatus::Expired => expired += 1,
            // Paid or cancelled in the meantime, or the window moved; skip.
            Ok(_) | Err(AppError::NotYetExpired) => {}
            Err(err) => {
                tracing::warn!(order_id = %order_id, error = %err, "expiry sweep failed for order");
            }
        }
    }

    Ok(expired)
}

pub async fn get_order(state: &AppState, order_id: Uuid) -> AppResult<OrderWithDetails> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .find_also_related(TicketTiers)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(item, tier)| OrderItemView {
            id: item.id,
            tier_name: tier.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
            tier_slug: tier.map(|t| t.slug).unwrap_or_default(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        })
        .collect();

    let attendee = Attendees::find()
        .filter(AttendeeCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .map(attendee_from_entity);

    let discount_code = match order.discount_code_id {
        Some(code_id) => match DiscountCodes::find_by_id(code_id).one(&state.orm).await? {
            Some(code) => {
                let discount_type = DiscountType::parse(&code.discount_type).ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "unknown discount type {:?}",
                        code.discount_type
                    ))
                })?;
                Some(DiscountCodeView {
                    code: code.code,
                    discount_type,
                    discount_value: code.discount_value,
                })
            }
            None => None,
        },
        None => None,
    };

    Ok(OrderWithDetails {
        order: order_from_entity(order)?,
        items,
        attendee,
        discount_code,
    })
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown order status \"{status}\"")))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok((orders, Meta::new(page, limit, total)))
}

async fn lock_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Return every item's quantity to its tier. Only legal while the order
/// still holds its reservation (the caller checks status first).
async fn release_items(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<()> {
    let mut items: Vec<OrderItemModel> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(txn)
        .await?;
    // Deterministic lock order across concurrent releases.
    items.sort_by_key(|item| item.ticket_tier_id);

    for item in items {
        tier_service::release(txn, item.ticket_tier_id, item.quantity).await?;
    }
    Ok(())
}

async fn audit(state: &AppState, action: &str, order_id: Uuid, extra: Option<Value>) {
    let metadata = match extra {
        Some(mut value) => {
            if let Some(map) = value.as_object_mut() {
                map.insert("order_id".into(), serde_json::json!(order_id));
            }
            value
        }
        None => serde_json::json!({ "order_id": order_id }),
    };
    if let Err(err) = log_audit(&state.pool, action, Some("orders"), Some(metadata)).await {
        tracing::warn!(error = %err, "audit log failed");
    }
}

fn parse_status(order: &OrderModel) -> AppResult<OrderStatus> {
    OrderStatus::parse(&order.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown order status {:?}", order.status))
    })
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = parse_status(&model)?;
    Ok(Order {
        id: model.id,
        status,
        subtotal_amount: model.subtotal_amount,
        discount_amount: model.discount_amount,
        total_amount: model.total_amount,
        currency: model.currency,
        discount_code_id: model.discount_code_id,
        payment_id: model.payment_id,
        payment_method: model.payment_method,
        expires_at: model.expires_at.with_timezone(&Utc),
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn attendee_from_entity(model: crate::entity::attendees::Model) -> Attendee {
    Attendee {
        id: model.id,
        order_id: model.order_id,
        name: model.name,
        email: model.email,
        country: model.country,
        job_title: model.job_title,
        company: model.company,
        industry: model.industry,
        org_type: model.org_type,
        cncf_consent: model.cncf_consent,
        whatsapp_updates: model.whatsapp_updates,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
