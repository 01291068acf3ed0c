//! Recurring transaction HTTP handlers.
//!
//! - POST /api/v1/recurring-transactions
//! - GET /api/v1/recurring-transactions?include_inactive=&fund_id=
//! - GET /api/v1/recurring-transactions/{id}
//! - PUT /api/v1/recurring-transactions/{id}
//! - DELETE /api/v1/recurring-transactions/{id}
//! - POST /api/v1/recurring-transactions/process - Run the daily job now

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::recurring::{ProcessSummary, RecurringFilter, RecurringRequest, RecurringTransaction},
    services::recurring_service,
};

/// Create a template. The first posting is due on `start_date`.
///
/// ```json
/// {
///   "description": "Monthly rent",
///   "amount_cents": 180000,
///   "transaction_type": "expense",
///   "category_id": "...",
///   "fund_id": "...",
///   "frequency": "monthly",
///   "start_date": "2025-01-31"
/// }
/// ```
pub async fn create_recurring(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<RecurringRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = recurring_service::create_recurring(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn list_recurring(
    State(pool): State<DbPool>,
    Query(filter): Query<RecurringFilter>,
) -> Result<Json<Vec<RecurringTransaction>>, AppError> {
    Ok(Json(recurring_service::list_recurring(&pool, &filter).await?))
}

pub async fn get_recurring(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringTransaction>, AppError> {
    Ok(Json(recurring_service::get_recurring(&pool, id).await?))
}

pub async fn update_recurring(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecurringRequest>,
) -> Result<Json<RecurringTransaction>, AppError> {
    Ok(Json(
        recurring_service::update_recurring(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_recurring(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    recurring_service::delete_recurring(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Post everything due today without waiting for the timer.
///
/// Safe to call repeatedly: occurrences already posted are skipped.
pub async fn process_now(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProcessSummary>, AppError> {
    tracing::info!(actor = %auth.user_name, "manual recurring transaction run");
    let today = Utc::now().date_naive();
    Ok(Json(recurring_service::process_due(&pool, today).await?))
}
