use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order lifecycle. PENDING and AWAITING_PAYMENT may still move;
/// PAID, CANCELLED and EXPIRED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
    Paid,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "AWAITING_PAYMENT" => Some(OrderStatus::AwaitingPayment),
            "PAID" => Some(OrderStatus::Paid),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "EXPIRED" => Some(OrderStatus::Expired),
            _ => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierStatus {
    Available,
    SoldOut,
    ComingSoon,
}

impl TierStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TierStatus::Available => "AVAILABLE",
            TierStatus::SoldOut => "SOLD_OUT",
            TierStatus::ComingSoon => "COMING_SOON",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(TierStatus::Available),
            "SOLD_OUT" => Some(TierStatus::SoldOut),
            "COMING_SOON" => Some(TierStatus::ComingSoon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::Fixed => "FIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENTAGE" => Some(DiscountType::Percentage),
            "FIXED" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketTier {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Minor units (cents).
    pub price: i64,
    pub currency: String,
    pub status: TierStatus,
    pub total_quantity: i32,
    pub sold_quantity: i32,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl TicketTier {
    pub fn available_quantity(&self) -> i32 {
        self.total_quantity - self.sold_quantity
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub subtotal_amount: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub discount_code_id: Option<Uuid>,
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Attendee {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub email: String,
    pub country: String,
    pub job_title: String,
    pub company: String,
    pub industry: String,
    pub org_type: String,
    pub cncf_consent: bool,
    pub whatsapp_updates: bool,
    pub created_at: DateTime<Utc>,
}

/// Discount code as exposed on an order view: enough to render the applied
/// discount, nothing operational.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiscountCodeView {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
}
