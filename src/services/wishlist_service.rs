use uuid::Uuid;

use crate::{
    dto::wishlist::{AddToWishlistRequest, WishlistList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::WishlistItem,
    response::{Ack, ApiResponse, Meta},
    state::AppState,
};

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistList>> {
    let items = state.storage.get_wishlist_items(user.user_id).await?;
    Ok(ApiResponse::success("OK", WishlistList { items }, None))
}

/// Adding a product that is already wishlisted returns the existing row.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddToWishlistRequest,
) -> AppResult<ApiResponse<WishlistItem>> {
    if state.storage.get_product(payload.product_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let item = state
        .storage
        .add_to_wishlist(user.user_id, payload.product_id)
        .await?;
    Ok(ApiResponse::success("Added to wishlist", item, None))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    if !state.storage.remove_from_wishlist(user.user_id, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Removed from wishlist",
        Ack::ok(),
        Some(Meta::empty()),
    ))
}
