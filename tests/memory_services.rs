use std::{sync::Arc, time::Duration};

use storefront_api::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, UpdateCartRequest},
        orders::{CreateOrderRequest, OrderData, OrderLineRequest, UpdateOrderStatusRequest},
        payments::ProcessPaymentRequest,
        products::UpdateProductRequest,
        wishlist::AddToWishlistRequest,
    },
    error::AppError,
    guest_cart::{GuestCart, GuestCartItem},
    middleware::auth::AuthUser,
    models::{OrderStatus, Product, Role},
    services::{
        auth_service, cart_service, order_service, payment_service, product_service,
        wishlist_service,
    },
    state::AppState,
    storage::{MemoryStorage, NewProduct, NewUser, Storage},
};
use tower_sessions::{MemoryStore, Session};
use uuid::Uuid;

fn setup() -> AppState {
    AppState::new(Arc::new(MemoryStorage::new()))
}

fn new_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

async fn create_product(state: &AppState, name: &str, price: i64) -> Product {
    state
        .storage
        .create_product(NewProduct {
            name: name.into(),
            description: format!("{name} for testing"),
            price,
            original_price: None,
            image: String::new(),
            images: vec![],
            category_id: None,
            rating: 4.0,
            review_count: 1,
            in_stock: true,
            featured: false,
            flash_deal: false,
            discount_percentage: 0,
            delivery_time: "Standard".into(),
            tags: vec!["test".into()],
        })
        .await
        .unwrap()
}

async fn create_user(state: &AppState, email: &str, role: Role) -> AuthUser {
    let user = state
        .storage
        .create_user(NewUser {
            email: email.into(),
            password_hash: auth_service::hash_password("secret1").unwrap(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
        })
        .await
        .unwrap();
    AuthUser {
        user_id: user.id,
        role: user.role,
    }
}

fn order_request(lines: &[(Uuid, i32, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        order_data: OrderData {
            total_amount: lines.iter().map(|(_, q, p)| *q as i64 * p).sum(),
            delivery_address: "1 Main Street".into(),
            estimated_delivery: None,
            payment_method: None,
            transaction_id: None,
        },
        items: lines
            .iter()
            .map(|(product_id, quantity, price)| OrderLineRequest {
                product_id: *product_id,
                quantity: *quantity,
                price: *price,
            })
            .collect(),
    }
}

#[tokio::test]
async fn repeated_add_sums_quantity_on_one_row() {
    let state = setup();
    let user = create_user(&state, "sum@example.com", Role::Customer).await;
    let product = create_product(&state, "Mug", 1200).await;

    for quantity in [2, 3] {
        cart_service::add_to_cart(
            &state,
            &user,
            AddToCartRequest {
                product_id: product.id,
                quantity,
            },
        )
        .await
        .unwrap();
    }

    let lines = state.storage.get_cart_items(user.user_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
    assert_eq!(lines[0].product.id, product.id);
}

#[tokio::test]
async fn adding_unknown_product_is_not_found() {
    let state = setup();
    let user = create_user(&state, "ghost@example.com", Role::Customer).await;

    let err = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn wishlist_add_twice_keeps_one_row() {
    let state = setup();
    let user = create_user(&state, "wish@example.com", Role::Customer).await;
    let product = create_product(&state, "Lamp", 2799).await;

    let first = wishlist_service::add_to_wishlist(
        &state,
        &user,
        AddToWishlistRequest {
            product_id: product.id,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    let second = wishlist_service::add_to_wishlist(
        &state,
        &user,
        AddToWishlistRequest {
            product_id: product.id,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();

    assert_eq!(first.id, second.id);
    let items = state.storage.get_wishlist_items(user.user_id).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn placing_order_empties_cart_and_freezes_prices() {
    let state = setup();
    let user = create_user(&state, "buyer@example.com", Role::Customer).await;
    let admin = create_user(&state, "boss@example.com", Role::Admin).await;
    let product = create_product(&state, "Keyboard", 4499).await;

    state
        .storage
        .add_to_cart(user.user_id, product.id, 2)
        .await
        .unwrap();

    let placed = order_service::create_order(&state, &user, order_request(&[(product.id, 2, 4499)]))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(placed.order.status, OrderStatus::Confirmed);
    assert_eq!(placed.order.total_amount, 8998);
    assert_eq!(placed.order.estimated_delivery, "10-15 minutes");
    assert_eq!(placed.order.payment_method, "cash");
    assert!(placed.order.tracking_id.starts_with("TRK-"));
    assert!(state.storage.get_cart_items(user.user_id).await.unwrap().is_empty());

    product_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            price: Some(9999),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let fetched = order_service::get_order(&state, &user, placed.order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].price, 4499);
}

#[tokio::test]
async fn order_without_items_is_rejected() {
    let state = setup();
    let user = create_user(&state, "empty@example.com", Role::Customer).await;

    let err = order_service::create_order(&state, &user, order_request(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn orders_are_private_to_owner_and_admin() {
    let state = setup();
    let owner = create_user(&state, "owner@example.com", Role::Customer).await;
    let other = create_user(&state, "other@example.com", Role::Customer).await;
    let admin = create_user(&state, "admin@example.com", Role::Admin).await;
    let product = create_product(&state, "Watch", 8999).await;

    let order = order_service::create_order(&state, &owner, order_request(&[(product.id, 1, 8999)]))
        .await
        .unwrap()
        .data
        .unwrap()
        .order;

    assert!(matches!(
        order_service::get_order(&state, &other, order.id).await,
        Err(AppError::NotFound)
    ));
    assert!(order_service::get_order(&state, &admin, order.id).await.is_ok());
}

#[tokio::test]
async fn status_moves_forward_only() {
    let state = setup();
    let user = create_user(&state, "track@example.com", Role::Customer).await;
    let admin = create_user(&state, "ops@example.com", Role::Admin).await;
    let product = create_product(&state, "Coffee", 1299).await;
    let order = order_service::create_order(&state, &user, order_request(&[(product.id, 1, 1299)]))
        .await
        .unwrap()
        .data
        .unwrap()
        .order;

    let update = |status: &str| UpdateOrderStatusRequest {
        status: status.to_string(),
    };

    assert!(matches!(
        order_service::update_order_status(&state, &user, order.id, update("preparing")).await,
        Err(AppError::Forbidden)
    ));

    let moved = order_service::update_order_status(&state, &admin, order.id, update("out_for_delivery"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(moved.status, OrderStatus::OutForDelivery);

    for rejected in ["preparing", "out_for_delivery", "shipped"] {
        assert!(matches!(
            order_service::update_order_status(&state, &admin, order.id, update(rejected)).await,
            Err(AppError::BadRequest(_))
        ));
    }

    let delivered = order_service::update_order_status(&state, &admin, order.id, update("delivered"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn update_to_zero_is_rejected_and_unknown_remove_is_not_found() {
    let state = setup();
    let user = create_user(&state, "qty@example.com", Role::Customer).await;
    let product = create_product(&state, "Mat", 1899).await;
    let item = state
        .storage
        .add_to_cart(user.user_id, product.id, 1)
        .await
        .unwrap();

    let err = cart_service::update_cart_item(&state, &user, item.id, UpdateCartRequest { quantity: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let lines = state.storage.get_cart_items(user.user_id).await.unwrap();
    assert_eq!(lines[0].quantity, 1);

    let err = cart_service::remove_from_cart(&state, &user, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn cart_line_for_deleted_product_is_dropped() {
    let state = setup();
    let user = create_user(&state, "lossy@example.com", Role::Customer).await;
    let admin = create_user(&state, "cleanup@example.com", Role::Admin).await;
    let kept = create_product(&state, "Kept", 100).await;
    let removed = create_product(&state, "Removed", 200).await;

    state.storage.add_to_cart(user.user_id, kept.id, 1).await.unwrap();
    state.storage.add_to_cart(user.user_id, removed.id, 1).await.unwrap();
    product_service::delete_product(&state, &admin, removed.id)
        .await
        .unwrap();

    let lines = state.storage.get_cart_items(user.user_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, kept.id);
}

#[tokio::test]
async fn registering_same_email_twice_fails() {
    let state = setup();
    let request = || RegisterRequest {
        email: "Twice@Example.com ".into(),
        password: "secret1".into(),
        first_name: "Jo".into(),
        last_name: "Doe".into(),
    };

    let created = auth_service::register_user(&state, &new_session(), request())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(created.email, "twice@example.com");
    assert_eq!(created.role, Role::Customer);

    let err = auth_service::register_user(&state, &new_session(), request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let state = setup();
    create_user(&state, "login@example.com", Role::Customer).await;

    let err = auth_service::login_user(
        &state,
        &new_session(),
        LoginRequest {
            email: "login@example.com".into(),
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn guest_cart_moves_into_durable_cart_after_login() {
    let state = setup();
    let user = create_user(&state, "guest@example.com", Role::Customer).await;
    let product = create_product(&state, "Speaker", 3499).await;
    state
        .storage
        .add_to_cart(user.user_id, product.id, 1)
        .await
        .unwrap();

    let session = new_session();
    cart_service::add_to_guest_cart(
        &state,
        &session,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await
    .unwrap();

    auth_service::login_user(
        &state,
        &session,
        LoginRequest {
            email: "guest@example.com".into(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap();

    let mut quantity = 0;
    for _ in 0..50 {
        let lines = state.storage.get_cart_items(user.user_id).await.unwrap();
        quantity = lines.first().map_or(0, |line| line.quantity);
        if quantity >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(quantity, 3);

    for _ in 0..50 {
        if GuestCart::load(&session).await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("guest cart was not emptied after migration");
}

#[tokio::test]
async fn guest_lines_for_missing_products_are_dropped() {
    let state = setup();
    let user = create_user(&state, "partial@example.com", Role::Customer).await;
    let product = create_product(&state, "Lens", 15999).await;
    let mut missing = product.clone();
    missing.id = Uuid::new_v4();

    let items = vec![
        GuestCartItem {
            id: Uuid::new_v4(),
            product_id: product.id,
            quantity: 1,
            product: product.clone(),
        },
        GuestCartItem {
            id: Uuid::new_v4(),
            product_id: missing.id,
            quantity: 4,
            product: missing.clone(),
        },
    ];

    let leftover = cart_service::migrate_guest_cart(state.storage.as_ref(), user.user_id, items).await;
    assert!(leftover.is_empty());

    let lines = state.storage.get_cart_items(user.user_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, product.id);
}

#[tokio::test]
async fn cart_add_past_max_quantity_is_rejected() {
    let state = setup();
    let user = create_user(&state, "bulk@example.com", Role::Customer).await;
    let product = create_product(&state, "Pen", 99).await;

    let add = |quantity| AddToCartRequest {
        product_id: product.id,
        quantity,
    };
    cart_service::add_to_cart(&state, &user, add(i32::MAX))
        .await
        .unwrap();
    let err = cart_service::add_to_cart(&state, &user, add(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let session = new_session();
    cart_service::add_to_guest_cart(&state, &session, add(i32::MAX))
        .await
        .unwrap();
    let err = cart_service::add_to_guest_cart(&state, &session, add(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let cart = GuestCart::load(&session).await.unwrap();
    assert_eq!(cart.items()[0].quantity, i32::MAX);
}

#[tokio::test]
async fn payment_is_recorded_on_callers_order() {
    let state = setup();
    let user = create_user(&state, "payer@example.com", Role::Customer).await;
    let stranger = create_user(&state, "stranger@example.com", Role::Customer).await;
    let product = create_product(&state, "Bag", 12999).await;
    let order = order_service::create_order(&state, &user, order_request(&[(product.id, 1, 12999)]))
        .await
        .unwrap()
        .data
        .unwrap()
        .order;

    let request = || ProcessPaymentRequest {
        amount: 12999,
        payment_method: "card".into(),
        order_id: Some(order.id),
    };

    assert!(matches!(
        payment_service::process_payment(&state, &stranger, request()).await,
        Err(AppError::NotFound)
    ));

    let receipt = payment_service::process_payment(&state, &user, request())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(receipt.status, "success");
    assert!(receipt.transaction_id.starts_with("TXN-"));

    let stored = state.storage.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_method, "card");
    assert_eq!(stored.transaction_id, Some(receipt.transaction_id));
}
