use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, ModelTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::items::{AddItemRequest, EditItemRequest, ItemWithTotal, PatchItemRequest},
    dto::orders::OrderTotal,
    entity::{
        order_items::{
            ActiveModel as ItemActive, Column as ItemCol, Entity as OrderItems, Model as ItemModel,
        },
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult, ValidationError},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Largest value a NUMERIC(15, 2) column can hold; stored order totals are
/// capped here rather than failing the mutation.
pub const TOTAL_CEILING: Decimal = dec!(9_999_999_999_999.99);

const OVERFLOW_WARNING: &str = "order total exceeded the storage ceiling and was capped";

/// A line item is always worth `quantity * price`.
pub fn item_total(quantity: i32, price: Decimal) -> Decimal {
    price * Decimal::from(quantity)
}

/// Cap a summed total at the storage ceiling. Returns the value to store and
/// whether capping occurred.
pub fn clamp_total(sum: Decimal) -> (Decimal, bool) {
    if sum > TOTAL_CEILING {
        (TOTAL_CEILING, true)
    } else {
        (sum, false)
    }
}

fn validate_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity < 1 {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price < Decimal::ZERO {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(())
}

fn validate_product_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyProductName);
    }
    Ok(trimmed.to_string())
}

/// `received` is checked against the quantity already stored on the row, not
/// against a quantity arriving in the same patch.
fn validate_received_quantity(received: i32, current_quantity: i32) -> Result<(), ValidationError> {
    if received < 0 {
        return Err(ValidationError::InvalidReceivedQuantity);
    }
    if received > current_quantity {
        return Err(ValidationError::ReceivedExceedsQuantity);
    }
    Ok(())
}

/// Take the order row under FOR UPDATE so concurrent item mutations on the
/// same order serialize on it; every committed total is then a fully-summed
/// value.
async fn lock_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn find_order_item(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    item_id: Uuid,
) -> AppResult<ItemModel> {
    let item = OrderItems::find_by_id(item_id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if item.order_id != order_id {
        return Err(AppError::NotFound);
    }
    Ok(item)
}

/// Sum the order's item totals (no items sums to zero), cap at the ceiling,
/// and write the result back. Idempotent: with unchanged items a second call
/// stores the same total. The caller holds the order row lock.
async fn recompute_order_total(
    txn: &DatabaseTransaction,
    order: OrderModel,
) -> AppResult<(Decimal, bool)> {
    let order_id = order.id;
    let items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(order_id))
        .all(txn)
        .await?;
    let sum: Decimal = items.iter().map(|item| item.item_total).sum();

    let (total, clamped) = clamp_total(sum);
    if clamped {
        tracing::warn!(%order_id, %sum, %total, "order total exceeded NUMERIC(15,2) ceiling, capped");
    }

    let mut active: OrderActive = order.into();
    active.total_amount = Set(total);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;

    Ok((total, clamped))
}

fn respond(
    message: &str,
    item: ItemModel,
    total_amount: Decimal,
    clamped: bool,
) -> ApiResponse<ItemWithTotal> {
    let resp = ApiResponse::success(
        message,
        ItemWithTotal {
            item: item.into(),
            total_amount,
        },
        Some(Meta::empty()),
    );
    if clamped {
        resp.with_warning(OVERFLOW_WARNING)
    } else {
        resp
    }
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: AddItemRequest,
) -> AppResult<ApiResponse<ItemWithTotal>> {
    let product_name = validate_product_name(&payload.product_name)?;
    validate_quantity(payload.quantity)?;
    validate_price(payload.price)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;

    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_name: Set(product_name),
        quantity: Set(payload.quantity),
        price: Set(payload.price),
        item_total: Set(item_total(payload.quantity, payload.price)),
        received_quantity: Set(0),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let (total_amount, clamped) = recompute_order_total(&txn, order).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_added",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order_id, "item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(respond("Item added", item, total_amount, clamped))
}

pub async fn edit_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
    payload: EditItemRequest,
) -> AppResult<ApiResponse<ItemWithTotal>> {
    let product_name = validate_product_name(&payload.product_name)?;
    validate_quantity(payload.quantity)?;
    validate_price(payload.price)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let item = find_order_item(&txn, order_id, item_id).await?;

    let mut active: ItemActive = item.into();
    active.product_name = Set(product_name);
    active.quantity = Set(payload.quantity);
    active.price = Set(payload.price);
    active.item_total = Set(item_total(payload.quantity, payload.price));
    let item = active.update(&txn).await?;

    let (total_amount, clamped) = recompute_order_total(&txn, order).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_updated",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order_id, "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(respond("Item updated", item, total_amount, clamped))
}

/// Inline edit: write only the supplied fields. All supplied fields are
/// validated before anything is written; one bad field rejects the whole
/// patch and leaves the order total untouched.
pub async fn patch_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
    payload: PatchItemRequest,
) -> AppResult<ApiResponse<ItemWithTotal>> {
    if payload.is_empty() {
        return Err(ValidationError::EmptyPatch.into());
    }

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let item = find_order_item(&txn, order_id, item_id).await?;

    let product_name = payload
        .product_name
        .as_deref()
        .map(validate_product_name)
        .transpose()?;
    if let Some(quantity) = payload.quantity {
        validate_quantity(quantity)?;
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(received) = payload.received_quantity {
        validate_received_quantity(received, item.quantity)?;
    }

    let quantity = payload.quantity.unwrap_or(item.quantity);
    let price = payload.price.unwrap_or(item.price);
    let rederive_total = payload.quantity.is_some() || payload.price.is_some();

    let mut active: ItemActive = item.into();
    if let Some(name) = product_name {
        active.product_name = Set(name);
    }
    if let Some(q) = payload.quantity {
        active.quantity = Set(q);
    }
    if let Some(p) = payload.price {
        active.price = Set(p);
    }
    if let Some(r) = payload.received_quantity {
        active.received_quantity = Set(r);
    }
    if rederive_total {
        active.item_total = Set(item_total(quantity, price));
    }
    let item = active.update(&txn).await?;

    let (total_amount, clamped) = recompute_order_total(&txn, order).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_patched",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order_id, "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(respond("Item updated", item, total_amount, clamped))
}

pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
) -> AppResult<ApiResponse<OrderTotal>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let item = find_order_item(&txn, order_id, item_id).await?;

    item.delete(&txn).await?;

    // Deleting the last item must leave the total at zero, not stale.
    let (total_amount, clamped) = recompute_order_total(&txn, order).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "item_deleted",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order_id, "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = ApiResponse::success("Item deleted", OrderTotal { total_amount }, Some(Meta::empty()));
    Ok(if clamped {
        resp.with_warning(OVERFLOW_WARNING)
    } else {
        resp
    })
}

pub async fn get_order_total(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderTotal>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        OrderTotal {
            total_amount: order.total_amount,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_total_is_quantity_times_price() {
        assert_eq!(item_total(3, dec!(10.50)), dec!(31.50));
        assert_eq!(item_total(1, dec!(0)), dec!(0));
        assert_eq!(item_total(2, dec!(5)), dec!(10));
    }

    #[test]
    fn clamp_leaves_values_at_or_below_ceiling_alone() {
        assert_eq!(clamp_total(dec!(0)), (dec!(0), false));
        assert_eq!(clamp_total(dec!(31.50)), (dec!(31.50), false));
        assert_eq!(clamp_total(TOTAL_CEILING), (TOTAL_CEILING, false));
    }

    #[test]
    fn clamp_caps_values_above_ceiling() {
        let over = TOTAL_CEILING + dec!(0.01);
        assert_eq!(clamp_total(over), (TOTAL_CEILING, true));

        let sum = dec!(9_000_000_000_000.00) + dec!(9_000_000_000_000.00);
        assert_eq!(clamp_total(sum), (TOTAL_CEILING, true));
    }

    #[test]
    fn quantity_must_be_at_least_one() {
        assert_eq!(validate_quantity(0), Err(ValidationError::InvalidQuantity));
        assert_eq!(validate_quantity(-3), Err(ValidationError::InvalidQuantity));
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn price_must_be_non_negative() {
        assert_eq!(
            validate_price(dec!(-0.01)),
            Err(ValidationError::InvalidPrice)
        );
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(dec!(10.50)).is_ok());
    }

    #[test]
    fn product_name_is_trimmed_and_must_not_be_blank() {
        assert_eq!(
            validate_product_name("   "),
            Err(ValidationError::EmptyProductName)
        );
        assert_eq!(
            validate_product_name(""),
            Err(ValidationError::EmptyProductName)
        );
        assert_eq!(validate_product_name("  widget  ").unwrap(), "widget");
    }

    #[test]
    fn received_quantity_is_bounded_by_stored_quantity() {
        assert_eq!(
            validate_received_quantity(-1, 3),
            Err(ValidationError::InvalidReceivedQuantity)
        );
        assert_eq!(
            validate_received_quantity(5, 3),
            Err(ValidationError::ReceivedExceedsQuantity)
        );
        assert!(validate_received_quantity(0, 3).is_ok());
        assert!(validate_received_quantity(3, 3).is_ok());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(PatchItemRequest::default().is_empty());
        assert!(
            !PatchItemRequest {
                quantity: Some(2),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
