use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shipment progression stages, plus a terminal `archived` state reachable
/// from any of them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "at_china_warehouse")]
    AtChinaWarehouse,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "arrived_in_russia")]
    ArrivedInRussia,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Registered
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub destination_city: Option<String>,
    pub status: OrderStatus,
    pub order_date: Date,
    pub shipping_cost_china_moscow: Decimal,
    pub shipping_cost_moscow_destination: Decimal,
    pub intermediary_china_moscow: Option<String>,
    pub tracking_number_china_moscow: Option<String>,
    pub intermediary_moscow_destination: Option<String>,
    pub tracking_number_moscow_destination: Option<String>,
    /// Denormalized sum of this order's item totals, capped at NUMERIC(15,2).
    pub total_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id"
    )]
    Clients,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
