use axum::Router;

use crate::state::AppState;

pub mod discounts;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod tiers;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/tiers", tiers::router())
        .nest("/discounts", discounts::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
}
