//! Ticket tier inventory: catalog reads plus the reserve/release ledger.
//!
//! Reservations and releases run inside the caller's transaction against
//! row-locked tiers, so two concurrent orders can never both claim the
//! last seats of a tier.

use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    entity::ticket_tiers::{
        ActiveModel as TierActive, Column as TierCol, Entity as TicketTiers, Model as TierModel,
    },
    error::{AppError, AppResult},
    models::{TicketTier, TierStatus},
    state::AppState,
};

pub async fn list_tiers(state: &AppState) -> AppResult<Vec<TicketTier>> {
    TicketTiers::find()
        .order_by_asc(TierCol::SortOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tier_from_entity)
        .collect()
}

pub async fn get_tier_by_slug(state: &AppState, slug: &str) -> AppResult<TicketTier> {
    let tier = TicketTiers::find()
        .filter(TierCol::Slug.eq(slug))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    tier_from_entity(tier)
}

/// Load and row-lock the tiers for the given slugs. Held until the caller's
/// transaction ends, serializing reservation against the same tiers.
/// Rows are taken in id order so overlapping orders acquire locks
/// consistently.
pub async fn lock_tiers_by_slug(
    txn: &DatabaseTransaction,
    slugs: &[String],
) -> AppResult<Vec<TierModel>> {
    let tiers = TicketTiers::find()
        .filter(TierCol::Slug.is_in(slugs.iter().cloned()))
        .order_by_asc(TierCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?;
    Ok(tiers)
}

/// Claim `quantity` seats on a locked tier.
///
/// The caller must hold the row lock from [`lock_tiers_by_slug`]; the
/// update still re-checks `sold + quantity <= total` so the counter can
/// never pass `total_quantity` even if a caller slips.
pub async fn reserve(
    txn: &DatabaseTransaction,
    tier: &TierModel,
    quantity: i32,
) -> AppResult<()> {
    if TierStatus::parse(&tier.status) != Some(TierStatus::Available) {
        return Err(AppError::TierUnavailable(tier.name.clone()));
    }
    if quantity > tier.total_quantity - tier.sold_quantity {
        return Err(AppError::InsufficientStock(tier.name.clone()));
    }

    let result = TicketTiers::update_many()
        .col_expr(
            TierCol::SoldQuantity,
            Expr::col(TierCol::SoldQuantity).add(quantity),
        )
        .filter(TierCol::Id.eq(tier.id))
        .filter(
            Expr::col(TierCol::SoldQuantity)
                .add(quantity)
                .lte(Expr::col(TierCol::TotalQuantity)),
        )
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::InsufficientStock(tier.name.clone()));
    }

    Ok(())
}

/// Return `quantity` seats to a tier, flooring the counter at zero.
///
/// Callers gate on order status so a reservation is released at most once;
/// the floor only matters if that gate is ever broken.
pub async fn release(txn: &DatabaseTransaction, tier_id: Uuid, quantity: i32) -> AppResult<()> {
    let tier = TicketTiers::find_by_id(tier_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_sold = (tier.sold_quantity - quantity).max(0);
    let mut active: TierActive = tier.into();
    active.sold_quantity = Set(new_sold);
    active.update(txn).await?;

    Ok(())
}

pub fn tier_from_entity(model: TierModel) -> AppResult<TicketTier> {
    let status = TierStatus::parse(&model.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown tier status {:?}", model.status))
    })?;
    Ok(TicketTier {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        price: model.price,
        currency: model.currency,
        status,
        total_quantity: model.total_quantity,
        sold_quantity: model.sold_quantity,
        sort_order: model.sort_order,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
