use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Client, Order, OrderItem, OrderStatus};

/// Order create/update form. Carries the client inline, the way the admin
/// panel submits it: an explicit `client_id` reuses (and refreshes) an
/// existing client, otherwise the client is looked up by name + phone and
/// created if absent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub destination_city: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_date: NaiveDate,
    pub shipping_cost_china_moscow: Option<Decimal>,
    pub shipping_cost_moscow_destination: Option<Decimal>,
    pub intermediary_china_moscow: Option<String>,
    pub tracking_number_china_moscow: Option<String>,
    pub intermediary_moscow_destination: Option<String>,
    pub tracking_number_moscow_destination: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub destination_city: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_date: NaiveDate,
    pub shipping_cost_china_moscow: Option<Decimal>,
    pub shipping_cost_moscow_destination: Option<Decimal>,
    pub intermediary_china_moscow: Option<String>,
    pub tracking_number_china_moscow: Option<String>,
    pub intermediary_moscow_destination: Option<String>,
    pub tracking_number_moscow_destination: Option<String>,
}

/// List row: the order plus the joined client name and the display total
/// including both shipping legs.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub client_name: Option<String>,
    pub total_with_shipping: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub client: Option<Client>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTotal {
    pub total_amount: Decimal,
}
