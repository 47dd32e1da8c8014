use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartEntry, CartList, ClearedCart, UpdateCartRequest},
    error::AppResult,
    middleware::auth::{AuthUser, OptionalAuth},
    models::CartItem,
    response::{Ack, ApiResponse},
    routes::extract::ValidatedJson,
    services::cart_service,
    state::AppState,
};

/// Guests are served from the session and logged-in users from storage.
/// Clearing the whole cart needs a login.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart_list).post(add_to_cart).delete(clear_cart),
        )
        .route("/{id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines with their products", body = ApiResponse<CartList>)
    ),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = match user {
        Some(user) => cart_service::list_cart(&state, &user).await?,
        None => cart_service::list_guest_cart(&session).await?,
    };
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Logged in: the resulting cart item", body = ApiResponse<CartItem>),
        (status = 200, description = "Guest: the whole guest cart", body = ApiResponse<CartList>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Product not found")
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> AppResult<Response> {
    let resp = match user {
        Some(user) => Json(cart_service::add_to_cart(&state, &user, payload).await?).into_response(),
        None => {
            Json(cart_service::add_to_guest_cart(&state, &session, payload).await?).into_response()
        }
    };
    Ok(resp)
}

#[utoipa::path(
    put,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart line ID")
    ),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Logged in: the updated cart item", body = ApiResponse<CartItem>),
        (status = 200, description = "Guest: the updated guest line", body = ApiResponse<CartEntry>),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Cart line not found")
    ),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCartRequest>,
) -> AppResult<Response> {
    let resp = match user {
        Some(user) => {
            Json(cart_service::update_cart_item(&state, &user, id, payload).await?).into_response()
        }
        None => {
            Json(cart_service::update_guest_cart_item(&session, id, payload).await?).into_response()
        }
    };
    Ok(resp)
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart line ID")
    ),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<Ack>),
        (status = 404, description = "Cart line not found")
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let resp = match user {
        Some(user) => cart_service::remove_from_cart(&state, &user, id).await?,
        None => cart_service::remove_from_guest_cart(&session, id).await?,
    };
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<ClearedCart>),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ClearedCart>>> {
    let resp = cart_service::clear_cart(&state, &user).await?;
    Ok(Json(resp))
}
