//! Daily and supply expense endpoints. `spentOn` defaults to today (UTC).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use ts_rs::TS;

use super::{ApiJson, ApiQuery, DateRangeQuery};
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{DailyExpense, SupplyExpense};
use stockbook_db::{NewDailyExpense, NewSupplyExpense};

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyExpenseRequest {
    pub title: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub spent_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplyExpenseRequest {
    pub supplier: String,
    pub description: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub spent_on: Option<NaiveDate>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `GET /api/expenses/daily?from=&to=`
pub async fn list_daily(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<Json<Vec<DailyExpense>>, ApiError> {
    Ok(Json(state.db().expenses().list_daily(range.from, range.to).await?))
}

/// `POST /api/expenses/daily`
pub async fn create_daily(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DailyExpenseRequest>,
) -> Result<(StatusCode, Json<DailyExpense>), ApiError> {
    let input = NewDailyExpense {
        title: body.title,
        amount_cents: body.amount_cents,
        note: body.note,
        spent_on: body.spent_on.unwrap_or_else(today),
    };
    let expense = state.db().expenses().create_daily(&input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `DELETE /api/expenses/daily/{id}`
pub async fn delete_daily(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().expenses().delete_daily(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/expenses/supply?from=&to=`
pub async fn list_supply(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<Json<Vec<SupplyExpense>>, ApiError> {
    Ok(Json(state.db().expenses().list_supply(range.from, range.to).await?))
}

/// `POST /api/expenses/supply`
pub async fn create_supply(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SupplyExpenseRequest>,
) -> Result<(StatusCode, Json<SupplyExpense>), ApiError> {
    let input = NewSupplyExpense {
        supplier: body.supplier,
        description: body.description,
        amount_cents: body.amount_cents,
        quantity: body.quantity,
        note: body.note,
        spent_on: body.spent_on.unwrap_or_else(today),
    };
    let expense = state.db().expenses().create_supply(&input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `DELETE /api/expenses/supply/{id}`
pub async fn delete_supply(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().expenses().delete_supply(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::testing;

    #[tokio::test]
    async fn test_daily_defaults_to_today() {
        let state = testing::state().await;
        let (status, Json(expense)) = create_daily(
            state.clone(),
            ApiJson(DailyExpenseRequest {
                title: "Electricity".to_string(),
                amount_cents: 1200,
                note: None,
                spent_on: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(expense.spent_on, today());

        let Json(listed) = list_daily(
            state.clone(),
            ApiQuery(DateRangeQuery {
                from: Some(today()),
                to: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);

        delete_daily(state.clone(), Path(expense.id.clone())).await.unwrap();
        let err = delete_daily(state, Path(expense.id)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_supply_validation() {
        let state = testing::state().await;
        let err = create_supply(
            state,
            ApiJson(SupplyExpenseRequest {
                supplier: "Metro".to_string(),
                description: "Rice sacks".to_string(),
                amount_cents: -5,
                quantity: Some(2),
                note: None,
                spent_on: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
