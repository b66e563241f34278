use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Client, Order};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClientRequest {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClientRequest {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: Client,
    pub order_count: i64,
    pub last_order_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientList {
    pub items: Vec<ClientSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientDetail {
    pub client: Client,
    pub orders: Vec<Order>,
}
