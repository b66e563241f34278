use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        clients::{ClientDetail, ClientList, ClientSummary, CreateClientRequest, UpdateClientRequest},
        items::{AddItemRequest, EditItemRequest, ItemWithTotal, PatchItemRequest},
        orders::{
            CreateOrderRequest, OrderDetail, OrderList, OrderSummary, OrderTotal,
            UpdateOrderRequest,
        },
    },
    models::{Client, Order, OrderItem, OrderStatus, User},
    response::{ApiResponse, Meta},
    routes::{auth, clients, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        clients::list_clients,
        clients::create_client,
        clients::get_client,
        clients::update_client,
        clients::delete_client,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        orders::archive_order,
        orders::get_order_total,
        orders::add_item,
        orders::edit_item,
        orders::patch_item,
        orders::delete_item
    ),
    components(
        schemas(
            User,
            Client,
            Order,
            OrderItem,
            OrderStatus,
            CreateClientRequest,
            UpdateClientRequest,
            ClientSummary,
            ClientList,
            ClientDetail,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderSummary,
            OrderList,
            OrderDetail,
            OrderTotal,
            AddItemRequest,
            EditItemRequest,
            PatchItemRequest,
            ItemWithTotal,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<OrderTotal>,
            ApiResponse<ItemWithTotal>,
            ApiResponse<Client>,
            ApiResponse<ClientList>,
            ApiResponse<ClientDetail>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Clients", description = "Client endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Order items", description = "Line-item mutations; every one recomputes the order total"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
