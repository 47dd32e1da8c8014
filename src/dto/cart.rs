use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    guest_cart::GuestCartItem,
    models::{CartLine, Product},
};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCartRequest {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

/// One cart line as seen by the client. `userId` is absent for guest lines.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product: Product,
}

impl From<CartLine> for CartEntry {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            user_id: Some(line.user_id),
            product_id: line.product_id,
            quantity: line.quantity,
            product: line.product,
        }
    }
}

impl From<GuestCartItem> for CartEntry {
    fn from(item: GuestCartItem) -> Self {
        Self {
            id: item.id,
            user_id: None,
            product_id: item.product_id,
            quantity: item.quantity,
            product: item.product,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CartList {
    #[schema(value_type = Vec<CartEntry>)]
    pub items: Vec<CartEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedCart {
    pub removed: u64,
}
