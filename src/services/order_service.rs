use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderDetail, OrderList, OrderSummary, UpdateOrderRequest},
    entity::{
        clients::{ActiveModel as ClientActive, Column as ClientCol, Entity as Clients},
        order_items::{Column as ItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult, ValidationError},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

fn validate_client_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyClientName);
    }
    Ok(trimmed.to_string())
}

fn validate_shipping_cost(cost: Option<Decimal>) -> Result<Decimal, ValidationError> {
    let cost = cost.unwrap_or(Decimal::ZERO);
    if cost < Decimal::ZERO {
        return Err(ValidationError::InvalidShippingCost);
    }
    Ok(cost)
}

/// Order forms carry the client inline. An explicit id reuses that client,
/// refreshing its name/phone when the form differs; otherwise look the
/// client up by name + phone and create it if absent.
async fn resolve_client(
    txn: &DatabaseTransaction,
    client_id: Option<Uuid>,
    name: &str,
    phone: Option<&str>,
) -> AppResult<Uuid> {
    if let Some(id) = client_id {
        let existing = Clients::find_by_id(id)
            .one(txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if existing.name != name || existing.phone.as_deref() != phone {
            let mut active: ClientActive = existing.into();
            active.name = Set(name.to_string());
            active.phone = Set(phone.map(str::to_string));
            active.update(txn).await?;
        }
        return Ok(id);
    }

    let mut finder = Clients::find().filter(ClientCol::Name.eq(name));
    finder = match phone {
        Some(p) => finder.filter(ClientCol::Phone.eq(p)),
        None => finder.filter(ClientCol::Phone.is_null()),
    };
    if let Some(client) = finder.one(txn).await? {
        return Ok(client.id);
    }

    let client = ClientActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        phone: Set(phone.map(str::to_string)),
        address: Set(None),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;
    Ok(client.id)
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders: Vec<Order> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let client_ids: Vec<Uuid> = orders.iter().map(|o| o.client_id).collect();
    let client_names: HashMap<Uuid, String> = Clients::find()
        .filter(ClientCol::Id.is_in(client_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let items = orders
        .into_iter()
        .map(|order| {
            let client_name = client_names.get(&order.client_id).cloned();
            let total_with_shipping = order.total_with_shipping();
            OrderSummary {
                order,
                client_name,
                total_with_shipping,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let client_name = validate_client_name(&payload.client_name)?;
    let leg_china_moscow = validate_shipping_cost(payload.shipping_cost_china_moscow)?;
    let leg_moscow_destination = validate_shipping_cost(payload.shipping_cost_moscow_destination)?;

    let txn = state.orm.begin().await?;
    let client_id = resolve_client(
        &txn,
        payload.client_id,
        &client_name,
        payload.client_phone.as_deref(),
    )
    .await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        client_id: Set(client_id),
        destination_city: Set(payload.destination_city),
        status: Set(payload.status.unwrap_or_default()),
        order_date: Set(payload.order_date),
        shipping_cost_china_moscow: Set(leg_china_moscow),
        shipping_cost_moscow_destination: Set(leg_moscow_destination),
        intermediary_china_moscow: Set(payload.intermediary_china_moscow),
        tracking_number_china_moscow: Set(payload.tracking_number_china_moscow),
        intermediary_moscow_destination: Set(payload.intermediary_moscow_destination),
        tracking_number_moscow_destination: Set(payload.tracking_number_moscow_destination),
        // no items yet
        total_amount: Set(Decimal::ZERO),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let client = Clients::find_by_id(order.client_id).one(&state.orm).await?;

    let items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(order.id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            order: order.into(),
            client: client.map(Into::into),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let client_name = validate_client_name(&payload.client_name)?;
    let leg_china_moscow = validate_shipping_cost(payload.shipping_cost_china_moscow)?;
    let leg_moscow_destination = validate_shipping_cost(payload.shipping_cost_moscow_destination)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let client_id = resolve_client(
        &txn,
        payload.client_id,
        &client_name,
        payload.client_phone.as_deref(),
    )
    .await?;

    let status = payload.status.unwrap_or(existing.status);
    let mut active: OrderActive = existing.into();
    active.client_id = Set(client_id);
    active.destination_city = Set(payload.destination_city);
    active.status = Set(status);
    active.order_date = Set(payload.order_date);
    active.shipping_cost_china_moscow = Set(leg_china_moscow);
    active.shipping_cost_moscow_destination = Set(leg_moscow_destination);
    active.intermediary_china_moscow = Set(payload.intermediary_china_moscow);
    active.tracking_number_china_moscow = Set(payload.tracking_number_china_moscow);
    active.intermediary_moscow_destination = Set(payload.intermediary_moscow_destination);
    active.tracking_number_moscow_destination = Set(payload.tracking_number_moscow_destination);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_updated",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order.into(),
        Some(Meta::empty()),
    ))
}

/// Terminal state reachable from any status; the order and its items stay.
pub async fn archive_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.into();
    active.status = Set(OrderStatus::Archived);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_archived",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order archived",
        order.into(),
        Some(Meta::empty()),
    ))
}

/// Cascades to the order's items.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_deleted",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
