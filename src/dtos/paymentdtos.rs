// dtos/paymentdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderDto {
    pub project_id: Uuid,

    /// Present for escrow payments; the amount then comes from the contract.
    pub contract_id: Option<Uuid>,

    /// Required for legacy non-escrow payments, in paise.
    #[validate(range(min = 100, message = "Amount must be at least ₹1"))]
    pub amount: Option<i64>,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentDto {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "Payment id is required"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponseDto {
    pub payment_id: Uuid,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub escrow_status: String,
    pub gateway_key_id: String,
}
