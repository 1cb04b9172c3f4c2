//! Discount code ledger: eligibility validation, discount arithmetic and
//! atomic redemption.
//!
//! Validation and redemption are deliberately separate. Validation is a
//! read; redemption is the durable `current_uses` increment and happens
//! only inside the order-creation transaction, re-checking the cap at
//! increment time.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::{
    dto::discounts::DiscountQuote,
    entity::discount_codes::{Column as CodeCol, Entity as DiscountCodes, Model as CodeModel},
    entity::ticket_tiers::{Column as TierCol, Entity as TicketTiers},
    error::{AppError, AppResult, DiscountInvalidReason},
    models::DiscountType,
    state::AppState,
};

/// A code that passed every eligibility check, carrying what pricing needs.
#[derive(Debug, Clone)]
pub struct ValidatedDiscount {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
}

/// Canonical form: trimmed, upper-cased. Lookups are case-insensitive
/// because storage always holds the canonical form.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Compute the discount for a validated code. Integer minor units; the
/// result never exceeds the subtotal.
pub fn calculate(subtotal: i64, discount_type: DiscountType, value: i64) -> i64 {
    let raw = match discount_type {
        DiscountType::Percentage => subtotal * value / 100,
        DiscountType::Fixed => value,
    };
    raw.min(subtotal).max(0)
}

/// Eligibility checks in reporting order. The first failure wins; later
/// checks are not evaluated.
fn check_eligibility(
    code: &CodeModel,
    now: DateTime<Utc>,
    selected_tier_ids: &[Uuid],
) -> Result<(), DiscountInvalidReason> {
    if !code.is_active {
        return Err(DiscountInvalidReason::Inactive);
    }
    if let Some(max_uses) = code.max_uses {
        if code.current_uses >= max_uses {
            return Err(DiscountInvalidReason::Exhausted);
        }
    }
    if let Some(valid_from) = code.valid_from {
        if now < valid_from.with_timezone(&Utc) {
            return Err(DiscountInvalidReason::NotYetValid);
        }
    }
    if let Some(valid_until) = code.valid_until {
        if now > valid_until.with_timezone(&Utc) {
            return Err(DiscountInvalidReason::Expired);
        }
    }
    if let Some(restricted_tier) = code.ticket_tier_id {
        if !selected_tier_ids.contains(&restricted_tier) {
            return Err(DiscountInvalidReason::TierRestricted);
        }
    }
    Ok(())
}

/// Validate a code against the selected tiers. Read-only; does not touch
/// `current_uses`.
pub async fn validate_code<C: ConnectionTrait>(
    conn: &C,
    raw_code: &str,
    selected_tier_ids: &[Uuid],
) -> AppResult<ValidatedDiscount> {
    let canonical = normalize_code(raw_code);
    if canonical.is_empty() {
        return Err(AppError::BadRequest("Please enter a discount code".into()));
    }

    let code = DiscountCodes::find()
        .filter(CodeCol::Code.eq(&canonical))
        .one(conn)
        .await?
        .ok_or(AppError::DiscountInvalid(DiscountInvalidReason::NotFound))?;

    check_eligibility(&code, Utc::now(), selected_tier_ids).map_err(AppError::DiscountInvalid)?;

    let discount_type = DiscountType::parse(&code.discount_type).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "unknown discount type {:?}",
            code.discount_type
        ))
    })?;

    Ok(ValidatedDiscount {
        id: code.id,
        code: code.code,
        description: code.description,
        discount_type,
        discount_value: code.discount_value,
    })
}

/// Validate a code for the public preview endpoint, pricing the quote when
/// a subtotal is supplied.
pub async fn quote(
    state: &AppState,
    raw_code: &str,
    tier_slugs: &[String],
    subtotal: Option<i64>,
) -> AppResult<DiscountQuote> {
    let tier_ids: Vec<Uuid> = TicketTiers::find()
        .filter(TierCol::Slug.is_in(tier_slugs.iter().cloned()))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let validated = validate_code(&state.orm, raw_code, &tier_ids).await?;

    let discount_amount =
        subtotal.map(|s| calculate(s, validated.discount_type, validated.discount_value));
    Ok(DiscountQuote {
        code: validated.code,
        discount_type: validated.discount_type,
        discount_value: validated.discount_value,
        description: validated.description,
        subtotal,
        discount_amount,
        total: subtotal.zip(discount_amount).map(|(s, d)| s - d),
    })
}

/// Durably redeem a code inside the order-creation transaction.
///
/// The increment re-checks `current_uses < max_uses` in the UPDATE itself,
/// so two orders racing past validation cannot both redeem the last use.
pub async fn redeem(txn: &DatabaseTransaction, code_id: Uuid) -> AppResult<()> {
    let result = DiscountCodes::update_many()
        .col_expr(
            CodeCol::CurrentUses,
            Expr::col(CodeCol::CurrentUses).add(1),
        )
        .filter(CodeCol::Id.eq(code_id))
        .filter(
            Condition::any()
                .add(CodeCol::MaxUses.is_null())
                .add(Expr::col(CodeCol::CurrentUses).lt(Expr::col(CodeCol::MaxUses))),
        )
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::DiscountInvalid(DiscountInvalidReason::Exhausted));
    }

    Ok(())
}
