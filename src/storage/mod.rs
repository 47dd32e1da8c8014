//! Persistence port shared by every backend.
//!
//! Services only talk to [`Storage`]; the concrete adapter is chosen once at
//! startup by [`connect`] and shared through [`SharedStorage`].

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::{AppConfig, StorageBackend},
    error::AppResult,
    models::{
        CartItem, CartLine, Category, Order, OrderItem, OrderStatus, Product, Role, User,
        WishlistItem, WishlistLine,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

pub type SharedStorage = Arc<dyn Storage>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub image: String,
    pub images: Vec<String>,
    pub category_id: Option<Uuid>,
    pub rating: f64,
    pub review_count: i32,
    pub in_stock: bool,
    pub featured: bool,
    pub flash_deal: bool,
    pub discount_percentage: i32,
    pub delivery_time: String,
    pub tags: Vec<String>,
}

/// Partial product update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub flash_deal: Option<bool>,
    pub discount_percentage: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub flash_deal: Option<bool>,
    pub limit: Option<u64>,
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub total_amount: i64,
    pub delivery_address: String,
    pub estimated_delivery: String,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub tracking_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
}

#[async_trait]
pub trait Storage: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Fails with `BadRequest` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> AppResult<User>;

    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>>;
    async fn create_category(&self, new: NewCategory) -> AppResult<Category>;

    /// Returns the requested page and the total number of matches.
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<(Vec<Product>, i64)>;
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn create_product(&self, new: NewProduct) -> AppResult<Product>;
    async fn update_product(&self, id: Uuid, changes: ProductChanges)
    -> AppResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> AppResult<bool>;

    /// Lines whose product no longer exists are left out.
    async fn get_cart_items(&self, user_id: Uuid) -> AppResult<Vec<CartLine>>;
    /// Adds `quantity` to the existing (user, product) row or creates it.
    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32)
    -> AppResult<CartItem>;
    async fn update_cart_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>>;
    async fn remove_from_cart(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;
    async fn clear_cart(&self, user_id: Uuid) -> AppResult<u64>;

    async fn get_wishlist_items(&self, user_id: Uuid) -> AppResult<Vec<WishlistLine>>;
    /// Returns the existing row when the pair is already present.
    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> AppResult<WishlistItem>;
    async fn remove_from_wishlist(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;

    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>>;
    async fn get_order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;
    /// Inserts the order and its items and empties the owner's cart, all or nothing.
    async fn place_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(Order, Vec<OrderItem>)>;
    /// Moves the order to `to` only while it is still in `from`. `None` when
    /// the order is missing or its status has changed in the meantime.
    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<Order>>;
    async fn record_payment(
        &self,
        id: Uuid,
        payment_method: &str,
        transaction_id: &str,
    ) -> AppResult<Option<Order>>;
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<SharedStorage> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
            let storage = PostgresStorage::connect(url).await?;
            storage.migrate().await?;
            Ok(Arc::new(storage))
        }
    }
}
