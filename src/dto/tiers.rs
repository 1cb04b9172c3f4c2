use serde::Serialize;
use utoipa::ToSchema;

use crate::models::TicketTier;

#[derive(Debug, Serialize, ToSchema)]
pub struct TierList {
    pub items: Vec<TicketTier>,
}
