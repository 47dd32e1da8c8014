use crate::{
    dto::orders::{OrderList, OrderListQuery},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    services::order_service::parse_status,
    state::AppState,
    storage::OrderFilter,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };
    let orders = state
        .storage
        .list_orders(&OrderFilter {
            user_id: None,
            status,
        })
        .await?;

    let meta = Meta::with_total(orders.len() as i64);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}
