//! Axum router construction.
//!
//! Builds the application router with all route groups, the OpenAPI
//! document, and middleware layers.

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(title = "Sales Insights API"),
    paths(
        routes::health::root,
        routes::health::health_check,
        routes::sales::create_sale,
        routes::sales::list_sales,
        routes::sales::get_sale,
        routes::sales::update_sale,
        routes::sales::delete_sale,
        routes::analytics::total_revenue,
        routes::analytics::total_items_sold,
        routes::analytics::top_products,
    ),
    components(schemas(
        routes::health::RootResponse,
        routes::health::HealthResponse,
        routes::sales::CreateSaleRequest,
        routes::sales::UpdateSaleRequest,
        routes::sales::SaleResponse,
        routes::analytics::RevenueResponse,
        routes::analytics::ItemsSoldResponse,
        routes::analytics::ProductSummaryResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        // Sales
        .route(
            "/api/sales",
            get(routes::sales::list_sales).post(routes::sales::create_sale),
        )
        .route(
            "/api/sales/{id}",
            get(routes::sales::get_sale)
                .put(routes::sales::update_sale)
                .delete(routes::sales::delete_sale),
        )
        // Analytics
        .route(
            "/api/sales/analytics/revenue",
            get(routes::analytics::total_revenue),
        )
        .route(
            "/api/sales/analytics/items-sold",
            get(routes::analytics::total_items_sold),
        )
        .route(
            "/api/sales/analytics/top-products",
            get(routes::analytics::top_products),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
