use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::tiers::TierList,
    error::AppResult,
    models::TicketTier,
    response::{ApiResponse, Meta},
    services::tier_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tiers))
        .route("/{slug}", get(get_tier))
}

#[utoipa::path(get, path = "/tiers", tag = "Tiers")]
pub async fn list_tiers(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TierList>>> {
    let items = tier_service::list_tiers(&state).await?;
    Ok(Json(ApiResponse::success(
        "Ok",
        TierList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(get, path = "/tiers/{slug}", tag = "Tiers")]
pub async fn get_tier(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<TicketTier>>> {
    let tier = tier_service::get_tier_by_slug(&state, &slug).await?;
    Ok(Json(ApiResponse::success("Ok", tier, Some(Meta::empty()))))
}
