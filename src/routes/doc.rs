use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, RegisterRequest, UpdateProfileRequest},
        cart::{AddToCartRequest, CartEntry, CartList, ClearedCart, UpdateCartRequest},
        orders::{
            CreateOrderRequest, OrderData, OrderLineRequest, OrderList, OrderWithItems,
            UpdateOrderStatusRequest,
        },
        payments::{PaymentReceipt, ProcessPaymentRequest},
        products::{
            CreateCategoryRequest, CreateProductRequest, ProductList, UpdateProductRequest,
        },
        wishlist::{AddToWishlistRequest, WishlistList},
    },
    middleware::session::SESSION_COOKIE_NAME,
    models::{
        CartItem, CartLine, Category, Order, OrderItem, OrderStatus, Product, Role, SessionUser,
        WishlistItem, WishlistLine,
    },
    response::{Ack, ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, payments, products, wishlist},
};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::current_user,
        auth::update_profile,
        products::list_categories,
        products::list_products,
        products::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order_status,
        payments::process_payment,
        admin::create_category,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_all_orders
    ),
    components(
        schemas(
            Role,
            SessionUser,
            Category,
            Product,
            CartItem,
            CartLine,
            WishlistItem,
            WishlistLine,
            OrderStatus,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            AddToCartRequest,
            UpdateCartRequest,
            CartEntry,
            CartList,
            ClearedCart,
            AddToWishlistRequest,
            WishlistList,
            CreateOrderRequest,
            OrderData,
            OrderLineRequest,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            ProcessPaymentRequest,
            PaymentReceipt,
            CreateCategoryRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            Ack,
            Meta,
            health::HealthData,
            ApiResponse<SessionUser>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and session user"),
        (name = "Catalog", description = "Categories and products"),
        (name = "Cart", description = "Guest and logged-in cart"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Orders", description = "Order placement and tracking"),
        (name = "Payments", description = "Simulated payments"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
