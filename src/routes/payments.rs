//! Inbound payment confirmation endpoints.
//!
//! The webhook answers 200 with a failure body on reconciliation errors so
//! the provider does not re-deliver; only a payload missing its
//! identifiers gets a 400. The browser redirect always lands on the
//! status page with a human-readable message.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::payments::{RedirectParams, WebhookAck, WebhookPayload},
    error::AppError,
    money,
    response::ApiResponse,
    services::payment_service::{self, Confirmation, ReconcileOutcome},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/result", get(payment_result))
}

#[utoipa::path(post, path = "/payments/webhook", tag = "Payments")]
pub async fn webhook(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> (StatusCode, Json<ApiResponse<WebhookAck>>) {
    let payload: WebhookPayload = match serde_json::from_value(raw.clone()) {
        Ok(payload) => payload,
        Err(_) => return bad_request("Malformed webhook payload"),
    };

    let (Some(order_id), Some(transaction_id)) = (payload.order_id, payload.transaction_id.clone())
    else {
        return bad_request("Missing orderId or transactionId");
    };

    let confirmation = Confirmation {
        order_id,
        transaction_id,
        status: payload.status.clone().unwrap_or_default(),
        amount: payload.amount.as_ref().and_then(money::value_to_minor),
        payment_result: Some(raw),
    };

    let (success, message) = match payment_service::reconcile(&state, confirmation).await {
        Ok(ReconcileOutcome::Completed(_)) => {
            (true, "Order updated to paid successfully".to_string())
        }
        Ok(ReconcileOutcome::NotApproved(status)) => (false, format!("Payment status: {status}")),
        Err(err) => (false, err.to_string()),
    };

    let ack = WebhookAck {
        success,
        message: message.clone(),
    };
    (
        StatusCode::OK,
        Json(ApiResponse::success(message, ack, None)),
    )
}

/// Browser redirect callback from the provider's hosted page. Verifies the
/// paid amount against the order total, reconciles, then forwards to the
/// status page with the verdict.
#[utoipa::path(get, path = "/payments/result", tag = "Payments")]
pub async fn payment_result(
    State(state): State<AppState>,
    Query(params): Query<RedirectParams>,
) -> Redirect {
    let mut success = false;
    let mut message = String::from("We could not verify your payment.");

    if let (Some(estado), Some(oper), Some(order_id)) =
        (params.estado.clone(), params.oper, params.order_id)
    {
        match params.total_pagado.as_deref().and_then(money::parse_minor) {
            Some(amount) => {
                let confirmation = Confirmation {
                    order_id,
                    transaction_id: oper,
                    status: estado,
                    amount: Some(amount),
                    payment_result: None,
                };
                match payment_service::reconcile(&state, confirmation).await {
                    Ok(ReconcileOutcome::Completed(_)) => {
                        success = true;
                        message = "Your order has been completed successfully.".to_string();
                    }
                    Ok(ReconcileOutcome::NotApproved(status)) => {
                        message = format!("Payment status: {status}");
                    }
                    Err(AppError::AmountMismatch) => {
                        message = "Payment amount does not match the order total.".to_string();
                    }
                    Err(AppError::NotFound) => {
                        message = "Order not found.".to_string();
                    }
                    Err(err) => {
                        message = err.to_string();
                    }
                }
            }
            None => {
                message = "Payment amount does not match the order total.".to_string();
            }
        }
    } else if let Some(estado) = params.estado {
        message = format!("Payment status: {estado}");
    }

    let target = status_redirect(state.payments.status_url(), success, &message);
    Redirect::to(&target)
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiResponse<WebhookAck>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::failure(message.to_string())),
    )
}

/// Append `success` and `message` to the status-page URL, percent-encoded.
fn status_redirect(status_url: &str, success: bool, message: &str) -> String {
    let mut encoder = match reqwest::Url::parse("http://status.invalid/") {
        Ok(url) => url,
        Err(_) => return status_url.to_string(),
    };
    encoder
        .query_pairs_mut()
        .append_pair("success", if success { "true" } else { "false" })
        .append_pair("message", message);

    match encoder.query() {
        Some(query) => format!("{status_url}?{query}"),
        None => status_url.to_string(),
    }
}
