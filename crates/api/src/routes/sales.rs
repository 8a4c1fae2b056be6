//! Sale CRUD and cancellation endpoints.

use std::str::FromStr;
use std::sync::Arc;

use application::{
    CancelSale, CancelSaleItem, CreateSale, DeleteSale, ListSales, SaleItemInput, SalePage,
    SaleService, UpdateSale,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId};
use domain::{Sale, SaleHeader, SaleItem};
use rust_decimal::Decimal;
use sale_store::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, SaleRepository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R: SaleRepository> {
    pub sale_service: SaleService<R>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SaleRequest {
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: String,
    pub customer_name: String,
    pub branch_id: String,
    pub branch_name: String,
    #[serde(default)]
    pub items: Vec<SaleItemRequest>,
}

#[derive(Deserialize)]
pub struct SaleItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Deserialize)]
pub struct CancelSaleRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListSalesParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub customer_id: Option<String>,
    pub branch_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl SaleRequest {
    fn into_parts(self) -> Result<(SaleHeader, Vec<SaleItemInput>), ApiError> {
        let header = SaleHeader {
            sale_number: self.sale_number,
            sale_date: self.sale_date,
            customer_id: parse_id::<CustomerId>("customer_id", &self.customer_id)?,
            customer_name: self.customer_name,
            branch_id: parse_id::<BranchId>("branch_id", &self.branch_id)?,
            branch_name: self.branch_name,
        };

        let items = self
            .items
            .into_iter()
            .map(|item| {
                Ok(SaleItemInput::new(
                    parse_id::<ProductId>("product_id", &item.product_id)?,
                    item.product_name,
                    item.quantity,
                    item.unit_price,
                ))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok((header, items))
    }
}

impl ListSalesParams {
    fn into_query(self) -> Result<ListSales, ApiError> {
        Ok(ListSales {
            page: self.page.unwrap_or(DEFAULT_PAGE),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            customer_id: self
                .customer_id
                .as_deref()
                .map(|id| parse_id::<CustomerId>("customer_id", id))
                .transpose()?,
            branch_id: self
                .branch_id
                .as_deref()
                .map(|id| parse_id::<BranchId>("branch_id", id))
                .transpose()?,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer_id: String,
    pub customer_name: String,
    pub branch_id: String,
    pub branch_name: String,
    pub total_amount: Decimal,
    pub status: String,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<SaleItemResponse>,
}

#[derive(Serialize)]
pub struct SaleItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub is_cancelled: bool,
}

#[derive(Serialize)]
pub struct SalePageResponse {
    pub items: Vec<SaleResponse>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Renders a money value with exactly two fractional digits.
fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value
}

impl From<&SaleItem> for SaleItemResponse {
    fn from(item: &SaleItem) -> Self {
        Self {
            id: item.id().to_string(),
            product_id: item.product_id().to_string(),
            product_name: item.product_name().to_string(),
            quantity: item.quantity(),
            unit_price: money(item.unit_price()),
            discount: money(item.discount()),
            total: money(item.total()),
            is_cancelled: item.is_cancelled(),
        }
    }
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id().to_string(),
            sale_number: sale.sale_number().to_string(),
            sale_date: sale.sale_date(),
            customer_id: sale.customer_id().to_string(),
            customer_name: sale.customer_name().to_string(),
            branch_id: sale.branch_id().to_string(),
            branch_name: sale.branch_name().to_string(),
            total_amount: money(sale.total_amount()),
            status: sale.status().to_string(),
            is_cancelled: sale.is_cancelled(),
            created_at: sale.created_at(),
            updated_at: sale.updated_at(),
            items: sale.items().iter().map(SaleItemResponse::from).collect(),
        }
    }
}

impl From<SalePage> for SalePageResponse {
    fn from(page: SalePage) -> Self {
        Self {
            has_next_page: page.has_next_page(),
            has_previous_page: page.has_previous_page(),
            items: page.items.iter().map(SaleResponse::from).collect(),
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

// -- Handlers --

/// POST /api/sales: register a new sale.
#[tracing::instrument(skip(state, req))]
pub async fn create<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<SaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let (header, items) = req.into_parts()?;

    let sale = state
        .sale_service
        .create_sale(CreateSale::new(header, items))
        .await?;

    Ok((StatusCode::CREATED, Json(SaleResponse::from(&sale))))
}

/// GET /api/sales: list sales page by page.
#[tracing::instrument(skip(state))]
pub async fn list<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Query(params): Query<ListSalesParams>,
) -> Result<Json<SalePageResponse>, ApiError> {
    let page = state.sale_service.list_sales(params.into_query()?).await?;
    Ok(Json(SalePageResponse::from(page)))
}

/// GET /api/sales/{id}: load a sale by ID.
#[tracing::instrument(skip(state))]
pub async fn get<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_id::<SaleId>("id", &id)?;
    let sale = state
        .sale_service
        .get_sale(sale_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale {id} not found")))?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// GET /api/sales/by-number/{sale_number}: load a sale by its number.
#[tracing::instrument(skip(state))]
pub async fn get_by_number<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(sale_number): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale = state
        .sale_service
        .get_sale_by_number(&sale_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale {sale_number} not found")))?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// PUT /api/sales/{id}: overwrite the header and reconcile items.
#[tracing::instrument(skip(state, req))]
pub async fn update<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<SaleRequest>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_id::<SaleId>("id", &id)?;
    let (header, items) = req.into_parts()?;

    let sale = state
        .sale_service
        .update_sale(UpdateSale::new(sale_id, header, items))
        .await?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// POST /api/sales/{id}/cancel: cancel the whole sale.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    req: Option<Json<CancelSaleRequest>>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_id::<SaleId>("id", &id)?;
    let reason = req.and_then(|Json(body)| body.reason);

    let sale = state
        .sale_service
        .cancel_sale(CancelSale { sale_id, reason })
        .await?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// POST /api/sales/{id}/items/{product_id}/cancel: cancel one line.
#[tracing::instrument(skip(state))]
pub async fn cancel_item<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_id::<SaleId>("id", &id)?;
    let product_id = parse_id::<ProductId>("product_id", &product_id)?;

    let sale = state
        .sale_service
        .cancel_sale_item(CancelSaleItem::new(sale_id, product_id))
        .await?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// DELETE /api/sales/{id}: remove a sale permanently.
#[tracing::instrument(skip(state))]
pub async fn delete<R: SaleRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let sale_id = parse_id::<SaleId>("id", &id)?;
    state
        .sale_service
        .delete_sale(DeleteSale::new(sale_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_id<T>(field: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
