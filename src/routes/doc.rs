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
        blacklist::BlacklistList,
        orders::{ActionSet, AppliedAction, OrderList, OrderWithAssessment, OrderWithEvents},
        products::ProductList,
    },
    lifecycle::{OrderAction, OrderStatus},
    models::{BlacklistEntry, Order, OrderEvent, Product, User},
    response::{ApiResponse, Meta},
    risk::{RiskAssessment, RiskLevel, RiskReason},
    routes::{auth, blacklist, health, orders, params, products},
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
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::list_actions,
        orders::apply_action,
        blacklist::list_blacklist,
        blacklist::add_to_blacklist,
        blacklist::remove_from_blacklist,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderEvent,
            BlacklistEntry,
            OrderStatus,
            OrderAction,
            RiskLevel,
            RiskReason,
            RiskAssessment,
            OrderList,
            OrderWithAssessment,
            OrderWithEvents,
            ActionSet,
            AppliedAction,
            BlacklistList,
            ProductList,
            params::Pagination,
            params::OrderListQuery,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<BlacklistEntry>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithAssessment>,
            ApiResponse<OrderWithEvents>,
            ApiResponse<ActionSet>,
            ApiResponse<AppliedAction>,
            ApiResponse<BlacklistList>,
            ApiResponse<ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Orders", description = "Order intake, risk triage and lifecycle actions"),
        (name = "Blacklist", description = "Per-account blacklisted phone numbers"),
        (name = "Products", description = "Product endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
