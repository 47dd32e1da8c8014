use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        CartItem, CartLine, Category, Order, OrderItem, OrderStatus, Product, User, WishlistItem,
        WishlistLine,
    },
};

use super::{
    NewCategory, NewOrder, NewOrderItem, NewProduct, NewUser, OrderFilter, ProductChanges,
    ProductFilter, Storage,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    products: Vec<Product>,
    cart_items: Vec<CartItem>,
    wishlist_items: Vec<WishlistItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

impl Tables {
    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// Process-local store. Every operation holds the lock for its whole
/// read-modify-write, so each call is atomic.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::BadRequest("Email is already taken".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, new: NewCategory) -> AppResult<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            name: new.name,
            icon: new.icon,
            color: new.color,
            description: new.description,
            created_at: Utc::now(),
        };
        self.tables.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<(Vec<Product>, i64)> {
        let tables = self.tables.read().await;
        let search = filter.search.as_deref().filter(|s| !s.is_empty());
        let matching: Vec<&Product> = tables
            .products
            .iter()
            .filter(|p| filter.category_id.is_none_or(|id| p.category_id == Some(id)))
            .filter(|p| search.is_none_or(|needle| p.matches_search(needle)))
            .filter(|p| filter.featured.is_none_or(|f| p.featured == f))
            .filter(|p| filter.flash_deal.is_none_or(|f| p.flash_deal == f))
            .collect();

        let total = matching.len() as i64;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.product(id).cloned())
    }

    async fn create_product(&self, new: NewProduct) -> AppResult<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            original_price: new.original_price,
            image: new.image,
            images: new.images,
            category_id: new.category_id,
            rating: new.rating,
            review_count: new.review_count,
            in_stock: new.in_stock,
            featured: new.featured,
            flash_deal: new.flash_deal,
            discount_percentage: new.discount_percentage,
            delivery_time: new.delivery_time,
            tags: new.tags,
            created_at: Utc::now(),
        };
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<Option<Product>> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(original_price) = changes.original_price {
            product.original_price = Some(original_price);
        }
        if let Some(in_stock) = changes.in_stock {
            product.in_stock = in_stock;
        }
        if let Some(featured) = changes.featured {
            product.featured = featured;
        }
        if let Some(flash_deal) = changes.flash_deal {
            product.flash_deal = flash_deal;
        }
        if let Some(discount) = changes.discount_percentage {
            product.discount_percentage = discount;
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        Ok(tables.products.len() != before)
    }

    async fn get_cart_items(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        let tables = self.tables.read().await;
        let lines = tables
            .cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                tables.product(item.product_id).map(|product| CartLine {
                    id: item.id,
                    user_id: item.user_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product: product.clone(),
                })
            })
            .collect();
        Ok(lines)
    }

    async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem> {
        let mut tables = self.tables.write().await;
        if let Some(item) = tables
            .cart_items
            .iter_mut()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            return Ok(item.clone());
        }

        let item = CartItem {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn update_cart_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>> {
        let mut tables = self.tables.write().await;
        let item = tables
            .cart_items
            .iter_mut()
            .find(|item| item.id == id && item.user_id == user_id)
            .map(|item| {
                item.quantity = quantity;
                item.clone()
            });
        Ok(item)
    }

    async fn remove_from_cart(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables
            .cart_items
            .retain(|item| !(item.id == id && item.user_id == user_id));
        Ok(tables.cart_items.len() != before)
    }

    async fn clear_cart(&self, user_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|item| item.user_id != user_id);
        Ok((before - tables.cart_items.len()) as u64)
    }

    async fn get_wishlist_items(&self, user_id: Uuid) -> AppResult<Vec<WishlistLine>> {
        let tables = self.tables.read().await;
        let lines = tables
            .wishlist_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                tables.product(item.product_id).map(|product| WishlistLine {
                    id: item.id,
                    user_id: item.user_id,
                    product_id: item.product_id,
                    product: product.clone(),
                })
            })
            .collect();
        Ok(lines)
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> AppResult<WishlistItem> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .wishlist_items
            .iter()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            return Ok(existing.clone());
        }

        let item = WishlistItem {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        tables.wishlist_items.push(item.clone());
        Ok(item)
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.wishlist_items.len();
        tables
            .wishlist_items
            .retain(|item| !(item.id == id && item.user_id == user_id));
        Ok(tables.wishlist_items.len() != before)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .iter()
            .rev()
            .filter(|o| filter.user_id.is_none_or(|id| o.user_id == id))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn place_order(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(Order, Vec<OrderItem>)> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            status: OrderStatus::Confirmed,
            total_amount: new.total_amount,
            delivery_address: new.delivery_address,
            estimated_delivery: new.estimated_delivery,
            payment_method: new.payment_method,
            transaction_id: new.transaction_id,
            tracking_id: new.tracking_id,
            created_at: now,
            updated_at: now,
        };

        let order_items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                created_at: now,
            })
            .collect();

        tables.orders.push(order.clone());
        tables.order_items.extend(order_items.iter().cloned());
        tables.cart_items.retain(|item| item.user_id != order.user_id);

        Ok((order, order_items))
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
            .map(|order| {
                order.status = to;
                order.updated_at = Utc::now();
                order.clone()
            });
        Ok(order)
    }

    async fn record_payment(
        &self,
        id: Uuid,
        payment_method: &str,
        transaction_id: &str,
    ) -> AppResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.iter_mut().find(|o| o.id == id).map(|order| {
            order.payment_method = payment_method.to_string();
            order.transaction_id = Some(transaction_id.to_string());
            order.updated_at = Utc::now();
            order.clone()
        });
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn new_product(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: String::new(),
            price,
            original_price: None,
            image: String::new(),
            images: vec![],
            category_id: None,
            rating: 0.0,
            review_count: 0,
            in_stock: true,
            featured: false,
            flash_deal: false,
            discount_percentage: 0,
            delivery_time: "Standard".into(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStorage::new();
        let new_user = NewUser {
            email: "a@example.com".into(),
            password_hash: "x".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            role: Role::Customer,
        };
        store.create_user(new_user.clone()).await.unwrap();
        let err = store.create_user(new_user).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn product_pages_report_full_total() {
        let store = MemoryStorage::new();
        for i in 0..5 {
            store
                .create_product(new_product(&format!("p{i}"), 100))
                .await
                .unwrap();
        }
        let filter = ProductFilter {
            limit: Some(2),
            offset: 2,
            ..Default::default()
        };
        let (page, total) = store.list_products(&filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            page.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ["p2", "p3"]
        );
    }

    #[tokio::test]
    async fn cart_rows_are_scoped_to_owner() {
        let store = MemoryStorage::new();
        let product = store.create_product(new_product("mug", 100)).await.unwrap();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let item = store.add_to_cart(owner, product.id, 1).await.unwrap();

        assert!(
            store
                .update_cart_item(stranger, item.id, 5)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.remove_from_cart(stranger, item.id).await.unwrap());
        assert!(store.remove_from_cart(owner, item.id).await.unwrap());
    }

    #[tokio::test]
    async fn cart_quantity_overflow_is_rejected() {
        let store = MemoryStorage::new();
        let product = store.create_product(new_product("mug", 100)).await.unwrap();
        let user = Uuid::new_v4();
        store.add_to_cart(user, product.id, i32::MAX).await.unwrap();

        let err = store.add_to_cart(user, product.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let lines = store.get_cart_items(user).await.unwrap();
        assert_eq!(lines[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn status_update_requires_expected_current_status() {
        let store = MemoryStorage::new();
        let new_order = NewOrder {
            user_id: Uuid::new_v4(),
            total_amount: 100,
            delivery_address: "1 Main Street".into(),
            estimated_delivery: "10-15 minutes".into(),
            payment_method: "cash".into(),
            transaction_id: None,
            tracking_id: "TRK-20260101-abcdef01".into(),
        };
        let (order, _) = store.place_order(new_order, vec![]).await.unwrap();

        let delivered = store
            .update_order_status(order.id, OrderStatus::Confirmed, OrderStatus::Delivered)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        let stale = store
            .update_order_status(order.id, OrderStatus::Confirmed, OrderStatus::Preparing)
            .await
            .unwrap();
        assert!(stale.is_none());
        let current = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::Delivered);
    }
}
