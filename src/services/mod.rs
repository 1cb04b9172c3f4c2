pub mod discount_service;
pub mod order_service;
pub mod payment_service;
pub mod tier_service;
