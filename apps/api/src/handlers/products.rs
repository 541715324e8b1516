//! # Product Endpoints
//!
//! Catalog CRUD plus the two sell flows.
//!
//! ## Sell Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/products/{id}/sell      one product, one history row         │
//! │       {"amount": 3, "soldPriceCents": 800}                              │
//! │       → ProductDetail (updated totals + history)                        │
//! │                                                                         │
//! │  POST /api/products/sell           many lines, one transaction header   │
//! │       {"items": [{"productId": "…", "amount": 2, "soldPriceCents": 50}]}│
//! │       → BulkSellOutcome, or nothing at all if any line fails            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;
use ts_rs::TS;

use super::{ApiJson, ApiQuery};
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{BulkSellOutcome, Product, ProductDetail};
use stockbook_db::{BulkSellLine, ProductFilter, ProductInput};

/// Create and full-replace body.
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub quantity: i64,
    pub initial_price_cents: i64,
    pub selling_price_cents: i64,
}

impl From<ProductRequest> for ProductInput {
    fn from(req: ProductRequest) -> Self {
        ProductInput {
            name: req.name,
            category_id: req.category_id,
            quantity: req.quantity,
            initial_price_cents: req.initial_price_cents,
            selling_price_cents: req.selling_price_cents,
        }
    }
}

/// Body of a single sell, shared with services.
#[derive(Debug, Clone, Copy, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellRequest {
    pub amount: i64,
    pub sold_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkSellItem {
    pub product_id: String,
    pub amount: i64,
    pub sold_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkSellRequest {
    pub items: Vec<BulkSellItem>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
}

/// `GET /api/products?search=&categoryId=`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
    };
    Ok(Json(state.db().products().list(&filter).await?))
}

/// `POST /api/products`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.db().products().create(&body.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /api/products/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>, ApiError> {
    Ok(Json(state.db().products().get_detail(&id).await?))
}

/// `PUT /api/products/{id}`. Replaces every editable field.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.db().products().update(&id, &body.into()).await?))
}

/// `DELETE /api/products/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().products().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/products/{id}/sell`
pub async fn sell(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SellRequest>,
) -> Result<Json<ProductDetail>, ApiError> {
    let detail = state
        .db()
        .ledger()
        .sell_product(&id, body.amount, body.sold_price_cents)
        .await?;
    Ok(Json(detail))
}

/// `POST /api/products/sell`
pub async fn bulk_sell(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkSellRequest>,
) -> Result<(StatusCode, Json<BulkSellOutcome>), ApiError> {
    debug!(lines = body.items.len(), "Bulk sell request");

    let lines: Vec<BulkSellLine> = body
        .items
        .into_iter()
        .map(|item| BulkSellLine {
            product_id: item.product_id,
            amount: item.amount,
            sold_price_cents: item.sold_price_cents,
        })
        .collect();

    let outcome = state.db().ledger().bulk_sell(&lines).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
