use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Attendee, DiscountCodeView, Order};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendeeInput {
    pub name: String,
    pub email: String,
    pub country: String,
    pub job_title: String,
    pub company: String,
    pub industry: String,
    pub org_type: String,
    #[serde(default)]
    pub cncf_consent: bool,
    #[serde(default)]
    pub whatsapp_updates: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Tier slug -> requested quantity. Zero-quantity entries are ignored.
    pub tickets: HashMap<String, i32>,
    pub attendee: AttendeeInput,
    pub discount_code: Option<String>,
}

/// Order item joined with the tier it snapshots, for display.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemView {
    pub id: Uuid,
    pub tier_name: String,
    pub tier_slug: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: Order,
    pub items: Vec<OrderItemView>,
    pub attendee: Option<Attendee>,
    pub discount_code: Option<DiscountCodeView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResult {
    pub expired: u64,
}
