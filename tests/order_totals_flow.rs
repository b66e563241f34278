use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use shiptrack_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        items::{AddItemRequest, EditItemRequest, PatchItemRequest},
        orders::CreateOrderRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::{AppError, ValidationError},
    middleware::auth::AuthUser,
    models::Order,
    services::{item_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow: create an order, mutate its items through every path,
// and watch the stored total track the sum of item totals.
#[tokio::test]
async fn item_mutations_keep_order_total_consistent() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let user = create_user(&state, "operator").await?;

    // A fresh order has no items and a zero total.
    let order = create_order(&state, &user, "Ivanova Anna").await?;
    assert_eq!(order.total_amount, Decimal::ZERO);

    // Add item: 3 x 10.50 = 31.50.
    let added = item_service::add_item(
        &state,
        &user,
        order.id,
        AddItemRequest {
            product_name: "  Phone case  ".into(),
            quantity: 3,
            price: dec!(10.50),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(added.item.product_name, "Phone case");
    assert_eq!(added.item.item_total, dec!(31.50));
    assert_eq!(added.total_amount, dec!(31.50));

    // Rejected patch: received quantity above the stored quantity. Nothing
    // is written and the total stays put.
    let err = item_service::patch_item(
        &state,
        &user,
        order.id,
        added.item.id,
        PatchItemRequest {
            received_quantity: Some(5),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::ReceivedExceedsQuantity)
    ));
    assert_eq!(stored_total(&state, order.id).await?, dec!(31.50));

    // Rejected add: quantity below one. No row created, total unchanged.
    let err = item_service::add_item(
        &state,
        &user,
        order.id,
        AddItemRequest {
            product_name: "Charger".into(),
            quantity: 0,
            price: dec!(5),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidQuantity)
    ));
    assert_eq!(stored_total(&state, order.id).await?, dec!(31.50));

    // A name-only patch re-triggers the recompute without changing the sum;
    // running it twice yields the same stored total both times.
    for _ in 0..2 {
        let patched = item_service::patch_item(
            &state,
            &user,
            order.id,
            added.item.id,
            PatchItemRequest {
                product_name: Some("Phone case (black)".into()),
                ..Default::default()
            },
        )
        .await?
        .data
        .unwrap();
        assert_eq!(patched.total_amount, dec!(31.50));
    }

    // Deleting the only item drops the total back to zero, not stale.
    let after_delete = item_service::delete_item(&state, &user, order.id, added.item.id)
        .await?
        .data
        .unwrap();
    assert_eq!(after_delete.total_amount, Decimal::ZERO);
    assert_eq!(stored_total(&state, order.id).await?, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn price_patch_recomputes_item_and_order_totals() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: no database configured.");
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let user = create_user(&state, "operator").await?;
    let order = create_order(&state, &user, "Petrov Oleg").await?;

    // Items: A = 2 x 5 = 10, B = 1 x 7 = 7, total 17.
    let item_a = item_service::add_item(
        &state,
        &user,
        order.id,
        AddItemRequest {
            product_name: "Headphones".into(),
            quantity: 2,
            price: dec!(5),
        },
    )
    .await?
    .data
    .unwrap();
    let item_b = item_service::add_item(
        &state,
        &user,
        order.id,
        AddItemRequest {
            product_name: "Cable".into(),
            quantity: 1,
            price: dec!(7),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(item_b.total_amount, dec!(17));

    // Patch A's price to 8: A becomes 16, order total 23.
    let patched = item_service::patch_item(
        &state,
        &user,
        order.id,
        item_a.item.id,
        PatchItemRequest {
            price: Some(dec!(8)),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(patched.item.item_total, dec!(16));
    assert_eq!(patched.total_amount, dec!(23));

    // Full edit of B: 2 x 7 = 14, order total 30.
    let edited = item_service::edit_item(
        &state,
        &user,
        order.id,
        item_b.item.id,
        EditItemRequest {
            product_name: "Cable (USB-C)".into(),
            quantity: 2,
            price: dec!(7),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(edited.item.item_total, dec!(14));
    assert_eq!(edited.total_amount, dec!(30));

    // Received quantity within bounds is accepted and leaves the total alone.
    let received = item_service::patch_item(
        &state,
        &user,
        order.id,
        item_b.item.id,
        PatchItemRequest {
            received_quantity: Some(2),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(received.item.received_quantity, 2);
    assert_eq!(received.total_amount, dec!(30));

    Ok(())
}

#[tokio::test]
async fn summed_totals_above_the_ceiling_are_capped() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: no database configured.");
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let user = create_user(&state, "operator").await?;
    let order = create_order(&state, &user, "Sidorova Maria").await?;

    // Each item fits NUMERIC(15,2) on its own; their sum does not.
    for _ in 0..2 {
        item_service::add_item(
            &state,
            &user,
            order.id,
            AddItemRequest {
                product_name: "Industrial press".into(),
                quantity: 1,
                price: dec!(9_000_000_000_000.00),
            },
        )
        .await?;
    }

    let total = stored_total(&state, order.id).await?;
    assert_eq!(total, item_service::TOTAL_CEILING);

    // The cap persists across a no-op recompute.
    let resp = item_service::get_order_total(&state, order.id).await?;
    assert_eq!(resp.data.unwrap().total_amount, item_service::TOTAL_CEILING);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    Ok(AppState { pool, orm })
}

// Tests run in parallel against the same database, so every test works on
// its own freshly inserted rows instead of truncating shared tables.
async fn create_user(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(format!("{username}-{}", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser { user_id: user.id })
}

async fn create_order(
    state: &AppState,
    user: &AuthUser,
    client_name: &str,
) -> anyhow::Result<Order> {
    let resp = order_service::create_order(
        state,
        user,
        CreateOrderRequest {
            client_id: None,
            client_name: client_name.into(),
            client_phone: Some("+7 900 000-00-00".into()),
            destination_city: Some("Moscow".into()),
            status: None,
            order_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            shipping_cost_china_moscow: Some(dec!(120.00)),
            shipping_cost_moscow_destination: None,
            intermediary_china_moscow: None,
            tracking_number_china_moscow: None,
            intermediary_moscow_destination: None,
            tracking_number_moscow_destination: None,
        },
    )
    .await?;
    Ok(resp.data.unwrap())
}

async fn stored_total(state: &AppState, order_id: Uuid) -> anyhow::Result<Decimal> {
    let resp = item_service::get_order_total(state, order_id).await?;
    Ok(resp.data.unwrap().total_amount)
}
