use tokio::task::JoinHandle;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartEntry, CartList, ClearedCart, UpdateCartRequest},
    error::{AppError, AppResult},
    guest_cart::{GuestCart, GuestCartItem},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{Ack, ApiResponse, Meta},
    state::AppState,
    storage::{SharedStorage, Storage},
};

fn ensure_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

async fn require_product(storage: &dyn Storage, product_id: Uuid) -> AppResult<Product> {
    storage
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Durable add shared by the cart endpoint and the guest-cart migration.
pub async fn add_line(
    storage: &dyn Storage,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartItem> {
    ensure_quantity(quantity)?;
    require_product(storage, product_id).await?;
    storage.add_to_cart(user_id, product_id, quantity).await
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let items = state
        .storage
        .get_cart_items(user.user_id)
        .await?
        .into_iter()
        .map(CartEntry::from)
        .collect();
    Ok(ApiResponse::success("OK", CartList { items }, None))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let item = add_line(
        state.storage.as_ref(),
        user.user_id,
        payload.product_id,
        payload.quantity,
    )
    .await?;
    Ok(ApiResponse::success("Added to cart", item, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_quantity(payload.quantity)?;
    let item = state
        .storage
        .update_cart_item(user.user_id, id, payload.quantity)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Cart updated", item, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    if !state.storage.remove_from_cart(user.user_id, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Removed from cart",
        Ack::ok(),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ClearedCart>> {
    let removed = state.storage.clear_cart(user.user_id).await?;
    Ok(ApiResponse::success(
        "Cart cleared",
        ClearedCart { removed },
        Some(Meta::empty()),
    ))
}

fn guest_cart_list(cart: GuestCart) -> CartList {
    CartList {
        items: cart.into_items().into_iter().map(CartEntry::from).collect(),
    }
}

pub async fn list_guest_cart(session: &Session) -> AppResult<ApiResponse<CartList>> {
    let cart = GuestCart::load(session).await?;
    Ok(ApiResponse::success("OK", guest_cart_list(cart), None))
}

pub async fn add_to_guest_cart(
    state: &AppState,
    session: &Session,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    ensure_quantity(payload.quantity)?;
    let product = require_product(state.storage.as_ref(), payload.product_id).await?;

    let mut cart = GuestCart::load(session).await?;
    cart.add(product, payload.quantity)?;
    cart.store(session).await?;

    Ok(ApiResponse::success(
        "Added to cart",
        guest_cart_list(cart),
        None,
    ))
}

pub async fn update_guest_cart_item(
    session: &Session,
    id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartEntry>> {
    ensure_quantity(payload.quantity)?;
    let mut cart = GuestCart::load(session).await?;
    let entry = cart
        .update(id, payload.quantity)
        .cloned()
        .map(CartEntry::from)
        .ok_or(AppError::NotFound)?;
    cart.store(session).await?;
    Ok(ApiResponse::success("Cart updated", entry, None))
}

pub async fn remove_from_guest_cart(session: &Session, id: Uuid) -> AppResult<ApiResponse<Ack>> {
    let mut cart = GuestCart::load(session).await?;
    if !cart.remove(id) {
        return Err(AppError::NotFound);
    }
    cart.store(session).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        Ack::ok(),
        Some(Meta::empty()),
    ))
}

/// Replays guest lines into `user_id`'s durable cart. Returns the lines that
/// may succeed on a later login so the caller can keep them. Lines rejected
/// for good (product gone, invalid quantity) are dropped.
pub async fn migrate_guest_cart(
    storage: &dyn Storage,
    user_id: Uuid,
    items: Vec<GuestCartItem>,
) -> Vec<GuestCartItem> {
    let mut failed = Vec::new();
    for item in items {
        match add_line(storage, user_id, item.product_id, item.quantity).await {
            Ok(_) => {}
            Err(err @ (AppError::NotFound | AppError::BadRequest(_))) => {
                tracing::warn!(
                    error = %err,
                    %user_id,
                    product_id = %item.product_id,
                    "guest cart line dropped"
                );
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    %user_id,
                    product_id = %item.product_id,
                    "guest cart line migration failed"
                );
                failed.push(item);
            }
        }
    }
    failed
}

pub fn spawn_guest_cart_migration(
    storage: SharedStorage,
    session: Session,
    user_id: Uuid,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let cart = match GuestCart::load(&session).await {
            Ok(cart) => cart,
            Err(err) => {
                tracing::warn!(error = %err, %user_id, "could not read guest cart");
                return;
            }
        };
        if cart.is_empty() {
            return;
        }

        let total = cart.items().len();
        let leftover = migrate_guest_cart(storage.as_ref(), user_id, cart.into_items()).await;
        tracing::debug!(
            %user_id,
            migrated = total - leftover.len(),
            kept = leftover.len(),
            "guest cart migrated"
        );

        let result = async {
            GuestCart::new(leftover).store(&session).await?;
            session.save().await?;
            Ok::<_, AppError>(())
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(
                error = %err,
                %user_id,
                "could not save session after guest cart migration"
            );
        }
    })
}
