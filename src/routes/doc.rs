use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        discounts::{DiscountQuote, ValidateDiscountRequest},
        orders::{AttendeeInput, CreateOrderRequest, OrderItemView, OrderList, OrderWithDetails, SweepResult},
        payments::{PaymentLinkData, RedirectParams, WebhookAck, WebhookPayload},
        tiers::TierList,
    },
    models::{Attendee, DiscountCodeView, DiscountType, Order, OrderStatus, TicketTier, TierStatus},
    response::{ApiResponse, Meta},
    routes::{discounts, health, orders, params, payments, tiers},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        tiers::list_tiers,
        tiers::get_tier,
        discounts::validate_discount,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::create_payment_link,
        orders::cancel_order,
        orders::expire_order,
        orders::sweep_expired,
        payments::webhook,
        payments::payment_result
    ),
    components(
        schemas(
            TicketTier,
            TierStatus,
            TierList,
            DiscountType,
            DiscountCodeView,
            ValidateDiscountRequest,
            DiscountQuote,
            Order,
            OrderStatus,
            Attendee,
            AttendeeInput,
            CreateOrderRequest,
            OrderItemView,
            OrderWithDetails,
            OrderList,
            SweepResult,
            PaymentLinkData,
            WebhookPayload,
            WebhookAck,
            RedirectParams,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<TicketTier>,
            ApiResponse<TierList>,
            ApiResponse<DiscountQuote>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentLinkData>,
            ApiResponse<WebhookAck>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Tiers", description = "Ticket tier catalog"),
        (name = "Discounts", description = "Discount code validation"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Payments", description = "Payment provider callbacks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
