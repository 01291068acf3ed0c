//! Fund HTTP handlers.
//!
//! - POST /api/v1/funds - Create fund with optional opening balance
//! - GET /api/v1/funds - List funds (paged)
//! - GET /api/v1/funds/{id} - Get fund
//! - PUT /api/v1/funds/{id} - Replace fund (version checked)
//! - DELETE /api/v1/funds/{id}?version=N - Soft delete
//! - POST /api/v1/funds/{id}/restore - Undo soft delete
//! - GET /api/v1/funds/{id}/summary - Income, expense and progress

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        DeletedParam, VersionParam,
        fund::{CreateFundRequest, Fund, FundFilter, FundSummary, UpdateFundRequest},
        pagination::Paged,
    },
    services::fund_service,
};

/// Create a fund.
///
/// ```json
/// {
///   "name": "Building Fund",
///   "fund_type": "restricted",
///   "target_cents": 5000000,
///   "opening_balance_cents": 120000
/// }
/// ```
pub async fn create_fund(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateFundRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fund = fund_service::create_fund(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(fund)))
}

pub async fn list_funds(
    State(pool): State<DbPool>,
    Query(filter): Query<FundFilter>,
) -> Result<Json<Paged<Fund>>, AppError> {
    Ok(Json(fund_service::list_funds(&pool, &filter).await?))
}

pub async fn get_fund(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<Fund>, AppError> {
    Ok(Json(
        fund_service::get_fund(&pool, id, params.include_deleted).await?,
    ))
}

/// Replace a fund's editable fields.
///
/// The body carries the `version` last read; a mismatch returns 409.
pub async fn update_fund(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFundRequest>,
) -> Result<Json<Fund>, AppError> {
    Ok(Json(
        fund_service::update_fund(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_fund(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(params): Query<VersionParam>,
) -> Result<StatusCode, AppError> {
    fund_service::delete_fund(&pool, &auth.user_name, id, params.version).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_fund(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Fund>, AppError> {
    Ok(Json(
        fund_service::restore_fund(&pool, &auth.user_name, id).await?,
    ))
}

pub async fn fund_summary(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<FundSummary>, AppError> {
    Ok(Json(fund_service::fund_summary(&pool, id).await?))
}
