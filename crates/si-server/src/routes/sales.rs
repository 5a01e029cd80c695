//! Sale CRUD route handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use si_core::{NewSale, Sale, SaleChanges, SaleFilter, SaleId};

use crate::context::AppContext;
use crate::error::AppError;

/// Request body for recording a sale.
///
/// `price` accepts a JSON number or a decimal string.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSaleRequest {
    #[schema(example = "Laptop")]
    pub product_name: String,
    #[schema(example = 2)]
    pub quantity: i64,
    #[schema(value_type = String, example = "999.99")]
    pub price: Decimal,
    #[schema(value_type = String, example = "2024-11-27")]
    pub sale_date: NaiveDate,
}

impl From<CreateSaleRequest> for NewSale {
    fn from(req: CreateSaleRequest) -> Self {
        Self {
            product_name: req.product_name,
            quantity: req.quantity,
            price: req.price,
            sale_date: req.sale_date,
        }
    }
}

/// Request body for a partial update. Omitted or `null` fields are kept.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateSaleRequest {
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    #[schema(value_type = Option<String>, example = "1099.99")]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "2024-12-01")]
    pub sale_date: Option<NaiveDate>,
}

impl From<UpdateSaleRequest> for SaleChanges {
    fn from(req: UpdateSaleRequest) -> Self {
        Self {
            product_name: req.product_name,
            quantity: req.quantity,
            price: req.price,
            sale_date: req.sale_date,
        }
    }
}

/// Sale response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SaleResponse {
    pub id: i64,
    pub product_name: String,
    pub quantity: i64,
    #[schema(value_type = String, example = "999.99")]
    pub price: Decimal,
    #[schema(value_type = String, example = "2024-11-27")]
    pub sale_date: NaiveDate,
    #[schema(value_type = String, example = "2024-11-27T10:30:00.123456")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, example = "2024-11-27T10:30:00.123456")]
    pub updated_at: NaiveDateTime,
}

impl SaleResponse {
    fn from_model(sale: &Sale) -> Self {
        Self {
            id: sale.id.get(),
            product_name: sale.product_name.clone(),
            quantity: sale.quantity,
            price: sale.price,
            sale_date: sale.sale_date,
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}

/// Filters shared by listing and the analytics endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaleQuery {
    /// Earliest sale date, inclusive (`YYYY-MM-DD`).
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    /// Latest sale date, inclusive (`YYYY-MM-DD`).
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Exact product name.
    pub product_name: Option<String>,
}

impl From<SaleQuery> for SaleFilter {
    fn from(q: SaleQuery) -> Self {
        Self {
            start_date: q.start_date,
            end_date: q.end_date,
            product_name: q.product_name,
        }
    }
}

pub(crate) fn parse_sale_id(raw: &str) -> Result<SaleId, AppError> {
    raw.parse()
        .map_err(|_| si_core::Error::Validation(format!("Invalid sale ID: '{raw}'")).into())
}

/// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = SaleResponse),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_sale(
    State(ctx): State<AppContext>,
    payload: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let sale = ctx.store.create_sale(payload.into()).await?;
    tracing::info!(sale_id = %sale.id, product = %sale.product_name, "Sale created");
    Ok((StatusCode::CREATED, Json(SaleResponse::from_model(&sale))))
}

/// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    params(SaleQuery),
    responses(
        (status = 200, description = "Matching sales, newest first", body = Vec<SaleResponse>),
        (status = 422, description = "Invalid filter")
    )
)]
pub async fn list_sales(
    State(ctx): State<AppContext>,
    query: Result<Query<SaleQuery>, QueryRejection>,
) -> Result<Json<Vec<SaleResponse>>, AppError> {
    let Query(query) = query?;
    let sales = ctx.store.list_sales(query.into()).await?;
    Ok(Json(sales.iter().map(SaleResponse::from_model).collect()))
}

/// GET /api/sales/:id
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    params(("id" = i64, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale details", body = SaleResponse),
        (status = 404, description = "Sale not found"),
        (status = 422, description = "Invalid sale ID")
    )
)]
pub async fn get_sale(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, AppError> {
    let sale_id = parse_sale_id(&id)?;
    let sale = ctx
        .store
        .get_sale(sale_id)
        .await?
        .ok_or_else(|| si_core::Error::not_found("sale", sale_id))?;
    Ok(Json(SaleResponse::from_model(&sale)))
}

/// PUT /api/sales/:id
#[utoipa::path(
    put,
    path = "/api/sales/{id}",
    params(("id" = i64, Path, description = "Sale ID")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Updated sale", body = SaleResponse),
        (status = 404, description = "Sale not found"),
        (status = 422, description = "Invalid payload or sale ID")
    )
)]
pub async fn update_sale(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSaleRequest>, JsonRejection>,
) -> Result<Json<SaleResponse>, AppError> {
    let sale_id = parse_sale_id(&id)?;
    let Json(payload) = payload?;
    let sale = ctx
        .store
        .update_sale(sale_id, payload.into())
        .await?
        .ok_or_else(|| si_core::Error::not_found("sale", sale_id))?;
    tracing::info!(sale_id = %sale.id, "Sale updated");
    Ok(Json(SaleResponse::from_model(&sale)))
}

/// DELETE /api/sales/:id
#[utoipa::path(
    delete,
    path = "/api/sales/{id}",
    params(("id" = i64, Path, description = "Sale ID")),
    responses(
        (status = 204, description = "Sale deleted"),
        (status = 404, description = "Sale not found"),
        (status = 422, description = "Invalid sale ID")
    )
)]
pub async fn delete_sale(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let sale_id = parse_sale_id(&id)?;
    if !ctx.store.delete_sale(sale_id).await? {
        return Err(si_core::Error::not_found("sale", sale_id).into());
    }
    tracing::info!(sale_id = %sale_id, "Sale deleted");
    Ok(StatusCode::NO_CONTENT)
}
