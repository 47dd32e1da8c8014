use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "is required"))]
    pub payment_method: String,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub status: String,
    pub amount: i64,
    pub payment_method: String,
    pub order_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}
