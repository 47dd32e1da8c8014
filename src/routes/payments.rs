use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::payments::{PaymentReceipt, ProcessPaymentRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::extract::ValidatedJson,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/process", post(process_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/process",
    request_body = ProcessPaymentRequest,
    responses(
        (status = 200, description = "Simulated payment receipt", body = ApiResponse<PaymentReceipt>),
        (status = 400, description = "Invalid amount or payment method"),
        (status = 404, description = "Order not found")
    ),
    security(("session_cookie" = [])),
    tag = "Payments"
)]
pub async fn process_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ProcessPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentReceipt>>> {
    let resp = payment_service::process_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}
