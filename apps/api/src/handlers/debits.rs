//! # Debit Endpoints
//!
//! ```text
//! POST /api/debits            {"customerName": "…", "sellHistoryIds": [...]}
//!                             → DebitDetail { PENDING }
//! POST /api/debits/{id}/pay   {"amountCents": 40}
//!                             → DebitDetail { PARTIAL | PAID }
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use ts_rs::TS;

use super::{ApiJson, ApiQuery};
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{Debit, DebitDetail, DebitStatus};
use stockbook_db::NewDebit;

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebitRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub sell_history_ids: Vec<String>,
}

impl From<DebitRequest> for NewDebit {
    fn from(req: DebitRequest) -> Self {
        NewDebit {
            customer_name: req.customer_name,
            customer_phone: req.customer_phone,
            note: req.note,
            sell_history_ids: req.sell_history_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct DebitQuery {
    /// PENDING, PARTIAL or PAID, any case.
    pub status: Option<String>,
}

/// `GET /api/debits?status=`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DebitQuery>,
) -> Result<Json<Vec<Debit>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<DebitStatus>)
        .transpose()?;

    Ok(Json(state.db().debits().list(status).await?))
}

/// `POST /api/debits`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DebitRequest>,
) -> Result<(StatusCode, Json<DebitDetail>), ApiError> {
    let detail = state.db().debits().create(&body.into()).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /api/debits/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DebitDetail>, ApiError> {
    Ok(Json(state.db().debits().get_detail(&id).await?))
}

/// `POST /api/debits/{id}/pay`
pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PayRequest>,
) -> Result<Json<DebitDetail>, ApiError> {
    Ok(Json(state.db().ledger().pay_debit(&id, body.amount_cents).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::testing;
    use stockbook_db::ProductInput;

    async fn debit_of_100(state: &State<AppState>) -> DebitDetail {
        let product = state
            .db()
            .products()
            .create(&ProductInput {
                name: "Rice".to_string(),
                category_id: None,
                quantity: 10,
                initial_price_cents: 5,
                selling_price_cents: 8,
            })
            .await
            .unwrap();
        let sale = state.db().ledger().sell_product(&product.id, 4, 25).await.unwrap();

        let (status, Json(detail)) = create(
            state.clone(),
            ApiJson(DebitRequest {
                customer_name: "Hassan".to_string(),
                customer_phone: None,
                note: None,
                sell_history_ids: vec![sale.history[0].id.clone()],
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        detail
    }

    fn amount(cents: i64) -> ApiJson<PayRequest> {
        ApiJson(PayRequest {
            amount_cents: cents,
        })
    }

    #[tokio::test]
    async fn test_pay_sequence() {
        let state = testing::state().await;
        let debit = debit_of_100(&state).await;
        let id = debit.debit.id.clone();
        assert_eq!(debit.debit.total_amount_cents, 100);

        let Json(partial) = pay(state.clone(), Path(id.clone()), amount(40)).await.unwrap();
        assert_eq!(partial.debit.status, DebitStatus::Partial);
        assert_eq!(partial.debit.paid_amount_cents, 40);

        let Json(paid) = pay(state.clone(), Path(id.clone()), amount(60)).await.unwrap();
        assert_eq!(paid.debit.status, DebitStatus::Paid);
        assert!(paid.debit.paid_at.is_some());

        let err = pay(state.clone(), Path(id.clone()), amount(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ExceedsTotal);

        let Json(after) = detail(state, Path(id)).await.unwrap();
        assert_eq!(after.debit.paid_amount_cents, 100);
        assert_eq!(after.debit.paid_at, paid.debit.paid_at);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let state = testing::state().await;
        debit_of_100(&state).await;

        let Json(pending) = list(
            state.clone(),
            ApiQuery(DebitQuery {
                status: Some("pending".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 1);

        let Json(paid) = list(
            state.clone(),
            ApiQuery(DebitQuery {
                status: Some("PAID".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(paid.is_empty());

        let err = list(
            state,
            ApiQuery(DebitQuery {
                status: Some("overdue".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_claimed_history_is_conflict() {
        let state = testing::state().await;
        let debit = debit_of_100(&state).await;

        let err = create(
            state,
            ApiJson(DebitRequest {
                customer_name: "Amina".to_string(),
                customer_phone: None,
                note: None,
                sell_history_ids: vec![debit.items[0].sell_history_id.clone()],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }
}
