use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderWithDetails, SweepResult},
    dto::payments::PaymentLinkData,
    error::AppResult,
    models::Order,
    response::{ApiResponse, Meta},
    services::{order_service, payment_service},
    state::AppState,
};

use super::params::OrderListQuery;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/sweep-expired", post(sweep_expired))
        .route("/{id}", get(get_order))
        .route("/{id}/payment-link", post(create_payment_link))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/expire", post(expire_order))
}

#[utoipa::path(post, path = "/orders", tag = "Orders")]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::create_order(&state, payload).await?;
    Ok(Json(ApiResponse::success(
        "Order created",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(get, path = "/orders", tag = "Orders")]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let (items, meta) = order_service::list_orders(&state, query).await?;
    Ok(Json(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(meta),
    )))
}

#[utoipa::path(get, path = "/orders/{id}", tag = "Orders")]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::get_order(&state, id).await?;
    Ok(Json(ApiResponse::success("Ok", order, Some(Meta::empty()))))
}

/// Ask the payment provider for a hosted link; the order moves to
/// AWAITING_PAYMENT once the provider accepts.
#[utoipa::path(post, path = "/orders/{id}/payment-link", tag = "Orders")]
pub async fn create_payment_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentLinkData>>> {
    let url = payment_service::request_payment_link(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Payment link created",
        PaymentLinkData { url },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(post, path = "/orders/{id}/cancel", tag = "Orders")]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::cancel_order(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    )))
}

/// Expire a single lapsed order. Intended for the scheduler collaborator;
/// terminal orders no-op.
#[utoipa::path(post, path = "/orders/{id}/expire", tag = "Orders")]
pub async fn expire_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::expire_order(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Ok",
        order,
        Some(Meta::empty()),
    )))
}

/// Expire every order whose reservation window lapsed without payment.
#[utoipa::path(post, path = "/orders/sweep-expired", tag = "Orders")]
pub async fn sweep_expired(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<SweepResult>>> {
    let expired = order_service::sweep_expired(&state).await?;
    Ok(Json(ApiResponse::success(
        "Sweep completed",
        SweepResult { expired },
        Some(Meta::empty()),
    )))
}
