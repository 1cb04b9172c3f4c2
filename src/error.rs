use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::{ApiResponse, Meta};

/// Why a discount code was rejected. Exactly one reason is reported per
/// validation: checks short-circuit in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DiscountInvalidReason {
    NotFound,
    Inactive,
    Exhausted,
    NotYetValid,
    Expired,
    TierRestricted,
}

impl DiscountInvalidReason {
    pub const fn message(&self) -> &'static str {
        match self {
            DiscountInvalidReason::NotFound => "Invalid discount code",
            DiscountInvalidReason::Inactive => "This discount code is no longer active",
            DiscountInvalidReason::Exhausted => "This discount code has reached its maximum uses",
            DiscountInvalidReason::NotYetValid => "This discount code is not yet valid",
            DiscountInvalidReason::Expired => "This discount code has expired",
            DiscountInvalidReason::TierRestricted => {
                "This discount code is not valid for the selected tickets"
            }
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            DiscountInvalidReason::NotFound => "not-found",
            DiscountInvalidReason::Inactive => "inactive",
            DiscountInvalidReason::Exhausted => "exhausted",
            DiscountInvalidReason::NotYetValid => "not-yet-valid",
            DiscountInvalidReason::Expired => "expired",
            DiscountInvalidReason::TierRestricted => "tier-restricted",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Ticket \"{0}\" is not available for purchase")]
    TierUnavailable(String),

    #[error("Not enough \"{0}\" tickets available")]
    InsufficientStock(String),

    #[error("{}", .0.message())]
    DiscountInvalid(DiscountInvalidReason),

    #[error("Payment amount does not match the order total")]
    AmountMismatch,

    #[error("Order has not expired yet")]
    NotYetExpired,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_)
            | AppError::TierUnavailable(_)
            | AppError::InsufficientStock(_)
            | AppError::NotYetExpired => StatusCode::CONFLICT,
            AppError::DiscountInvalid(_) | AppError::AmountMismatch => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let reason = match &self {
            AppError::DiscountInvalid(r) => Some(r.as_str()),
            _ => None,
        };

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                reason,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
