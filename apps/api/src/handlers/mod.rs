//! # HTTP Handlers
//!
//! One module per resource. Handlers are thin: extract, call one
//! repository method, wrap the result in JSON.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/products/{id}/sell   {"amount": 3, "soldPriceCents": 800}    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  State<AppState>, Path<String>, ApiJson<SellRequest>                    │
//! │         │         (bad JSON → 400 VALIDATION_ERROR)                     │
//! │         ▼                                                               │
//! │  db.ledger().sell_product(id, 3, 800)                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Json<ProductDetail>  or  ApiError → status + {code, message}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod categories;
pub mod debits;
pub mod expenses;
pub mod health;
pub mod products;
pub mod reports;
pub mod sell_history;
pub mod services;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use ts_rs::TS;

use crate::error::ApiError;

/// `Json` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Query` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, both inclusive and optional.
#[derive(Debug, Clone, Copy, Default, Deserialize, TS)]
#[ts(export)]
pub struct DateRangeQuery {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}
