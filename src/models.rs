use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;

pub use crate::entity::orders::OrderStatus;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub destination_city: Option<String>,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub shipping_cost_china_moscow: Decimal,
    pub shipping_cost_moscow_destination: Decimal,
    pub intermediary_china_moscow: Option<String>,
    pub tracking_number_china_moscow: Option<String>,
    pub intermediary_moscow_destination: Option<String>,
    pub tracking_number_moscow_destination: Option<String>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub item_total: Decimal,
    pub received_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::clients::Model> for Client {
    fn from(model: entity::clients::Model) -> Self {
        Client {
            id: model.id,
            name: model.name,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Order {
            id: model.id,
            client_id: model.client_id,
            destination_city: model.destination_city,
            status: model.status,
            order_date: model.order_date,
            shipping_cost_china_moscow: model.shipping_cost_china_moscow,
            shipping_cost_moscow_destination: model.shipping_cost_moscow_destination,
            intermediary_china_moscow: model.intermediary_china_moscow,
            tracking_number_china_moscow: model.tracking_number_china_moscow,
            intermediary_moscow_destination: model.intermediary_moscow_destination,
            tracking_number_moscow_destination: model.tracking_number_moscow_destination,
            total_amount: model.total_amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl Order {
    /// Display total: the stored item total plus both shipping legs. Shipping
    /// is never folded into `total_amount` itself.
    pub fn total_with_shipping(&self) -> Decimal {
        self.total_amount + self.shipping_cost_china_moscow + self.shipping_cost_moscow_destination
    }
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(model: entity::order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price: model.price,
            item_total: model.item_total,
            received_quantity: model.received_quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
