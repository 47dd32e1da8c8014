//! Cart held in the session before the shopper logs in.
//!
//! Lines carry a temporary id and a snapshot of the product taken when the
//! line was first added. At login they are replayed into the durable cart
//! (see `services::cart_service::migrate_guest_cart`).

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::session::session_keys,
    models::Product,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestCartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product: Product,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestCart {
    items: Vec<GuestCartItem>,
}

impl GuestCart {
    pub fn new(items: Vec<GuestCartItem>) -> Self {
        Self { items }
    }

    pub async fn load(session: &Session) -> AppResult<Self> {
        Ok(session
            .get::<GuestCart>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    /// Writes the cart back; an empty cart removes the key.
    pub async fn store(&self, session: &Session) -> AppResult<()> {
        if self.items.is_empty() {
            session.remove::<GuestCart>(session_keys::GUEST_CART).await?;
        } else {
            session.insert(session_keys::GUEST_CART, self).await?;
        }
        Ok(())
    }

    pub fn items(&self) -> &[GuestCartItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<GuestCartItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sums into an existing line for the same product, otherwise appends.
    /// A sum past `i32::MAX` is rejected and leaves the line unchanged.
    pub fn add(&mut self, product: Product, quantity: i32) -> AppResult<&GuestCartItem> {
        let position = match self.items.iter().position(|i| i.product_id == product.id) {
            Some(index) => {
                let line = &mut self.items[index];
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
                index
            }
            None => {
                self.items.push(GuestCartItem {
                    id: Uuid::new_v4(),
                    product_id: product.id,
                    quantity,
                    product,
                });
                self.items.len() - 1
            }
        };
        Ok(&self.items[position])
    }

    pub fn update(&mut self, id: Uuid, quantity: i32) -> Option<&GuestCartItem> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        item.quantity = quantity;
        Some(item)
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            price: 500,
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
            created_at: Utc::now(),
        }
    }

    #[test]
    fn adding_same_product_sums_quantity() {
        let mut cart = GuestCart::default();
        let tea = product("tea");
        let first_id = cart.add(tea.clone(), 2).unwrap().id;
        let second = cart.add(tea, 3).unwrap();

        assert_eq!(second.id, first_id);
        assert_eq!(second.quantity, 5);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn quantity_overflow_is_rejected() {
        let mut cart = GuestCart::default();
        let tea = product("tea");
        cart.add(tea.clone(), i32::MAX).unwrap();

        assert!(matches!(cart.add(tea, 1), Err(AppError::BadRequest(_))));
        assert_eq!(cart.items()[0].quantity, i32::MAX);
    }

    #[test]
    fn update_and_remove_target_line_id() {
        let mut cart = GuestCart::default();
        let id = cart.add(product("tea"), 1).unwrap().id;
        cart.add(product("milk"), 1).unwrap();

        assert_eq!(cart.update(id, 4).map(|i| i.quantity), Some(4));
        assert!(cart.update(Uuid::new_v4(), 4).is_none());
        assert!(cart.remove(id));
        assert!(!cart.remove(id));
        assert_eq!(cart.items().len(), 1);
    }

    #[tokio::test]
    async fn round_trips_through_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(GuestCart::load(&session).await.unwrap().is_empty());

        let mut cart = GuestCart::default();
        cart.add(product("tea"), 2).unwrap();
        cart.store(&session).await.unwrap();
        assert_eq!(GuestCart::load(&session).await.unwrap(), cart);

        GuestCart::default().store(&session).await.unwrap();
        assert!(GuestCart::load(&session).await.unwrap().is_empty());
    }
}
