use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::discounts::{DiscountQuote, ValidateDiscountRequest},
    error::AppResult,
    response::{ApiResponse, Meta},
    services::discount_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_discount))
}

/// Preview a discount code against the current selection without
/// redeeming it.
#[utoipa::path(post, path = "/discounts/validate", tag = "Discounts")]
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(payload): Json<ValidateDiscountRequest>,
) -> AppResult<Json<ApiResponse<DiscountQuote>>> {
    let quote = discount_service::quote(
        &state,
        &payload.code,
        &payload.tier_slugs,
        payload.subtotal,
    )
    .await?;
    Ok(Json(ApiResponse::success(
        "Discount code is valid",
        quote,
        Some(Meta::empty()),
    )))
}
