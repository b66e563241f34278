use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::clients::{
        ClientDetail, ClientList, ClientSummary, CreateClientRequest, UpdateClientRequest,
    },
    entity::{
        clients::{ActiveModel as ClientActive, Column as ClientCol, Entity as Clients},
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult, ValidationError},
    middleware::auth::AuthUser,
    models::Client,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyClientName);
    }
    Ok(trimmed.to_string())
}

pub async fn list_clients(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ClientList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Clients::find().order_by_asc(ClientCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let clients = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let client_ids: Vec<Uuid> = clients.iter().map(|c| c.id).collect();
    let orders = Orders::find()
        .filter(OrderCol::ClientId.is_in(client_ids))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;

    // First order seen per client is the most recent one.
    let mut stats: HashMap<Uuid, (i64, Option<NaiveDate>)> = HashMap::new();
    for order in orders {
        let entry = stats.entry(order.client_id).or_insert((0, None));
        entry.0 += 1;
        if entry.1.is_none() {
            entry.1 = Some(order.order_date);
        }
    }

    let items = clients
        .into_iter()
        .map(|client| {
            let (order_count, last_order_date) =
                stats.get(&client.id).copied().unwrap_or((0, None));
            ClientSummary {
                client: client.into(),
                order_count,
                last_order_date,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", ClientList { items }, Some(meta)))
}

pub async fn create_client(
    state: &AppState,
    user: &AuthUser,
    payload: CreateClientRequest,
) -> AppResult<ApiResponse<Client>> {
    let name = validate_name(&payload.name)?;

    let client = ClientActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        phone: Set(payload.phone),
        address: Set(payload.address),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "client_created",
        Some("clients"),
        Some(serde_json::json!({ "client_id": client.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Client created",
        client.into(),
        Some(Meta::empty()),
    ))
}

pub async fn get_client(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ClientDetail>> {
    let client = Clients::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let orders = Orders::find()
        .filter(OrderCol::ClientId.eq(client.id))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        ClientDetail {
            client: client.into(),
            orders,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_client(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateClientRequest,
) -> AppResult<ApiResponse<Client>> {
    let name = validate_name(&payload.name)?;

    let existing = Clients::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ClientActive = existing.into();
    active.name = Set(name);
    active.phone = Set(payload.phone);
    active.address = Set(payload.address);
    let client = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "client_updated",
        Some("clients"),
        Some(serde_json::json!({ "client_id": client.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Client updated",
        client.into(),
        Some(Meta::empty()),
    ))
}

/// Cascades to the client's orders and their items.
pub async fn delete_client(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Clients::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "client_deleted",
        Some("clients"),
        Some(serde_json::json!({ "client_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Client deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
