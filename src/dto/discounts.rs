use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::DiscountType;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateDiscountRequest {
    pub code: String,
    /// Slugs of the tiers the buyer currently has selected; used for
    /// tier-restricted codes.
    #[serde(default)]
    pub tier_slugs: Vec<String>,
    /// Optional subtotal in minor units. When present the quote includes
    /// the computed discount and total.
    pub subtotal: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountQuote {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}
