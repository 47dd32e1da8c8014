use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderList, OrderListQuery, OrderWithItems, UpdateOrderStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    state::AppState,
    storage::{NewOrder, NewOrderItem, OrderFilter},
};

pub const DEFAULT_ESTIMATED_DELIVERY: &str = "10-15 minutes";
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

pub fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.trim()
        .parse()
        .map_err(|err: String| AppError::BadRequest(err))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Places an order from the lines the client sends. Prices are taken as
/// supplied and frozen on the order items.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let CreateOrderRequest { order_data, items } = payload;

    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    let delivery_address = order_data.delivery_address.trim().to_string();
    if delivery_address.is_empty() {
        return Err(AppError::BadRequest("deliveryAddress is required".into()));
    }

    let new_order = NewOrder {
        user_id: user.user_id,
        total_amount: order_data.total_amount,
        delivery_address,
        estimated_delivery: non_blank(order_data.estimated_delivery)
            .unwrap_or_else(|| DEFAULT_ESTIMATED_DELIVERY.to_string()),
        payment_method: non_blank(order_data.payment_method)
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        transaction_id: non_blank(order_data.transaction_id),
        tracking_id: build_tracking_id(Uuid::new_v4()),
    };
    let lines = items
        .iter()
        .map(|line| NewOrderItem {
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        })
        .collect();

    let (order, items) = state.storage.place_order(new_order, lines).await?;
    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = order.total_amount,
        "order placed"
    );

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status,
    };

    let orders = state.storage.list_orders(&filter).await?;
    let meta = Meta::with_total(orders.len() as i64);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Owner or admin only; anyone else sees 404.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = match state.storage.get_order(id).await? {
        Some(o) if o.user_id == user.user_id || user.is_admin() => o,
        _ => return Err(AppError::NotFound),
    };
    let items = state.storage.get_order_items(order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Moves an order strictly forward along its delivery states.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = parse_status(&payload.status)?;

    let current = state
        .storage
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if current.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "order is already {}",
            current.status
        )));
    }
    if !current.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "cannot move order from {} to {}",
            current.status, next
        )));
    }

    let order = state
        .storage
        .update_order_status(id, current.status, next)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "order is no longer {}, reload and retry",
                current.status
            ))
        })?;
    tracing::info!(order_id = %order.id, from = %current.status, to = %next, "order status updated");

    Ok(ApiResponse::success(
        "Order status updated",
        order,
        Some(Meta::empty()),
    ))
}

pub fn build_tracking_id(seed: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = seed.simple().to_string();
    let short = &suffix[..8];
    format!("TRK-{}-{}", date, short)
}
