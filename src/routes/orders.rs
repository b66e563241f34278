use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        items::{AddItemRequest, EditItemRequest, ItemWithTotal, PatchItemRequest},
        orders::{CreateOrderRequest, OrderDetail, OrderList, OrderTotal, UpdateOrderRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{item_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/archive", post(archive_order))
        .route("/{id}/total", get(get_order_total))
        .route("/{id}/items", post(add_item))
        .route(
            "/{id}/items/{item_id}",
            put(edit_item).patch(patch_item).delete(delete_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "asc or desc by order date, default desc"),
    ),
    responses(
        (status = 200, description = "List orders with client names and shipping-inclusive totals", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Create order (total starts at zero)", body = ApiResponse<Order>),
        (status = 400, description = "Validation failure"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with client and items", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Deleted order and its items"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = order_service::delete_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/archive",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Archived order", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn archive_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::archive_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/total",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Stored order total", body = ApiResponse<OrderTotal>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Order items"
)]
pub async fn get_order_total(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTotal>>> {
    let resp = item_service::get_order_total(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/items",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added; order total recomputed", body = ApiResponse<ItemWithTotal>),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Order items"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<ApiResponse<ItemWithTotal>>> {
    let resp = item_service::add_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Item ID"),
    ),
    request_body = EditItemRequest,
    responses(
        (status = 200, description = "Item replaced; order total recomputed", body = ApiResponse<ItemWithTotal>),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Order or item not found"),
    ),
    tag = "Order items"
)]
pub async fn edit_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditItemRequest>,
) -> AppResult<Json<ApiResponse<ItemWithTotal>>> {
    let resp = item_service::edit_item(&state, &user, id, item_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Item ID"),
    ),
    request_body = PatchItemRequest,
    responses(
        (status = 200, description = "Supplied fields written; order total recomputed", body = ApiResponse<ItemWithTotal>),
        (status = 400, description = "Validation failure; nothing written"),
        (status = 404, description = "Order or item not found"),
    ),
    tag = "Order items"
)]
pub async fn patch_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<PatchItemRequest>,
) -> AppResult<Json<ApiResponse<ItemWithTotal>>> {
    let resp = item_service::patch_item(&state, &user, id, item_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Item ID"),
    ),
    responses(
        (status = 200, description = "Item deleted; order total recomputed", body = ApiResponse<OrderTotal>),
        (status = 404, description = "Order or item not found"),
    ),
    tag = "Order items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<OrderTotal>>> {
    let resp = item_service::delete_item(&state, &user, id, item_id).await?;
    Ok(Json(resp))
}
