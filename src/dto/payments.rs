use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentLinkData {
    pub url: String,
}

/// Provider webhook body. Everything beyond the identifiers is passed
/// through to reconciliation as the opaque payment result.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub order_id: Option<Uuid>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    /// Amount paid; the provider sends either a number or a string.
    #[schema(value_type = Object)]
    pub amount: Option<Value>,
    pub email: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

/// Query parameters of the browser redirect callback. Names are the
/// provider's, verbatim.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RedirectParams {
    #[serde(rename = "TotalPagado")]
    pub total_pagado: Option<String>,
    #[serde(rename = "Estado")]
    pub estado: Option<String>,
    #[serde(rename = "Oper")]
    pub oper: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}
