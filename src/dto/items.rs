use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::OrderItem;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditItemRequest {
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Sparse inline edit: only the supplied fields are written.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchItemRequest {
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub received_quantity: Option<i32>,
}

impl PatchItemRequest {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.received_quantity.is_none()
    }
}

/// Every item mutation answers with the item and the freshly recomputed
/// order total, so the caller never has to re-derive it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemWithTotal {
    pub item: OrderItem,
    pub total_amount: Decimal,
}
