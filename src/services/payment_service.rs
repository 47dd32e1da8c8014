use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::payments::{PaymentReceipt, ProcessPaymentRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Simulated gateway: every well-formed request succeeds.
pub async fn process_payment(
    state: &AppState,
    user: &AuthUser,
    payload: ProcessPaymentRequest,
) -> AppResult<ApiResponse<PaymentReceipt>> {
    let payment_method = payload.payment_method.trim().to_string();
    if payment_method.is_empty() {
        return Err(AppError::BadRequest("paymentMethod is required".into()));
    }
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }

    let transaction_id = build_transaction_id(Uuid::new_v4());

    if let Some(order_id) = payload.order_id {
        match state.storage.get_order(order_id).await? {
            Some(order) if order.user_id == user.user_id => {}
            _ => return Err(AppError::NotFound),
        }
        state
            .storage
            .record_payment(order_id, &payment_method, &transaction_id)
            .await?
            .ok_or(AppError::NotFound)?;
    }

    tracing::info!(
        user_id = %user.user_id,
        transaction_id = %transaction_id,
        amount = payload.amount,
        "payment processed"
    );

    Ok(ApiResponse::success(
        "Payment processed",
        PaymentReceipt {
            transaction_id,
            status: "success".to_string(),
            amount: payload.amount,
            payment_method,
            order_id: payload.order_id,
            timestamp: Utc::now(),
        },
        Some(Meta::empty()),
    ))
}

pub fn build_transaction_id(seed: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = seed.simple().to_string().to_uppercase();
    format!("TXN-{}-{}", date, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_is_uppercase() {
        let id = build_transaction_id(Uuid::new_v4());
        assert!(id.starts_with("TXN-"));
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert_eq!(suffix, suffix.to_uppercase());
    }
}
