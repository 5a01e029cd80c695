//! Aggregate sales figures.
//!
//! Every endpoint takes the same filters as `GET /api/sales`.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use si_core::{ProductSummary, SaleFilter};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::sales::SaleQuery;

pub const DEFAULT_TOP_PRODUCTS: u32 = 5;
pub const MAX_TOP_PRODUCTS: u32 = 100;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RevenueResponse {
    #[schema(value_type = String, example = "3546.38")]
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ItemsSoldResponse {
    pub total_items_sold: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProductSummaryResponse {
    pub product_name: String,
    pub total_quantity: i64,
    #[schema(value_type = String, example = "199.90")]
    pub total_revenue: Decimal,
}

impl ProductSummaryResponse {
    fn from_model(summary: &ProductSummary) -> Self {
        Self {
            product_name: summary.product_name.clone(),
            total_quantity: summary.total_quantity,
            total_revenue: summary.total_revenue,
        }
    }
}

/// Filters plus a result limit.
///
/// Not flattened from [`SaleQuery`]: numbers do not survive `serde(flatten)`
/// in query strings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopProductsQuery {
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub product_name: Option<String>,
    /// Number of products to return, 1 to 100 (default 5).
    pub limit: Option<u32>,
}

/// GET /api/sales/analytics/revenue
#[utoipa::path(
    get,
    path = "/api/sales/analytics/revenue",
    params(SaleQuery),
    responses(
        (status = 200, description = "Total revenue of matching sales", body = RevenueResponse),
        (status = 422, description = "Invalid filter")
    )
)]
pub async fn total_revenue(
    State(ctx): State<AppContext>,
    query: Result<Query<SaleQuery>, QueryRejection>,
) -> Result<Json<RevenueResponse>, AppError> {
    let Query(query) = query?;
    let total_revenue = ctx.store.total_revenue(query.into()).await?;
    Ok(Json(RevenueResponse { total_revenue }))
}

/// GET /api/sales/analytics/items-sold
#[utoipa::path(
    get,
    path = "/api/sales/analytics/items-sold",
    params(SaleQuery),
    responses(
        (status = 200, description = "Units sold across matching sales", body = ItemsSoldResponse),
        (status = 422, description = "Invalid filter")
    )
)]
pub async fn total_items_sold(
    State(ctx): State<AppContext>,
    query: Result<Query<SaleQuery>, QueryRejection>,
) -> Result<Json<ItemsSoldResponse>, AppError> {
    let Query(query) = query?;
    let total_items_sold = ctx.store.total_items_sold(query.into()).await?;
    Ok(Json(ItemsSoldResponse { total_items_sold }))
}

/// GET /api/sales/analytics/top-products
#[utoipa::path(
    get,
    path = "/api/sales/analytics/top-products",
    params(TopProductsQuery),
    responses(
        (status = 200, description = "Best sellers by units sold", body = Vec<ProductSummaryResponse>),
        (status = 422, description = "Invalid filter or limit")
    )
)]
pub async fn top_products(
    State(ctx): State<AppContext>,
    query: Result<Query<TopProductsQuery>, QueryRejection>,
) -> Result<Json<Vec<ProductSummaryResponse>>, AppError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_PRODUCTS);
    if !(1..=MAX_TOP_PRODUCTS).contains(&limit) {
        return Err(si_core::Error::validation(format!(
            "limit must be between 1 and {MAX_TOP_PRODUCTS}"
        ))
        .into());
    }

    let filter = SaleFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        product_name: query.product_name,
    };
    let products = ctx.store.top_products(filter, limit).await?;
    Ok(Json(
        products.iter().map(ProductSummaryResponse::from_model).collect(),
    ))
}
