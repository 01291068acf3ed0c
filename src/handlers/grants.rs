//! Grant HTTP handlers.
//!
//! - POST /api/v1/grants
//! - GET /api/v1/grants?status=&fund_id=
//! - GET /api/v1/grants/{id}
//! - PUT /api/v1/grants/{id} - version checked
//! - DELETE /api/v1/grants/{id}?version=N
//! - POST /api/v1/grants/{id}/restore
//! - GET /api/v1/grants/{id}/utilization - Spent vs. awarded

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
        grant::{Grant, GrantFilter, GrantRequest, GrantUtilization, UpdateGrantRequest},
        pagination::Paged,
    },
    services::grant_service,
};

pub async fn create_grant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = grant_service::create_grant(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn list_grants(
    State(pool): State<DbPool>,
    Query(filter): Query<GrantFilter>,
) -> Result<Json<Paged<Grant>>, AppError> {
    Ok(Json(grant_service::list_grants(&pool, &filter).await?))
}

pub async fn get_grant(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<Grant>, AppError> {
    Ok(Json(
        grant_service::get_grant(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_grant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateGrantRequest>,
) -> Result<Json<Grant>, AppError> {
    Ok(Json(
        grant_service::update_grant(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_grant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(params): Query<VersionParam>,
) -> Result<StatusCode, AppError> {
    grant_service::delete_grant(&pool, &auth.user_name, id, params.version).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_grant(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Grant>, AppError> {
    Ok(Json(
        grant_service::restore_grant(&pool, &auth.user_name, id).await?,
    ))
}

pub async fn grant_utilization(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<GrantUtilization>, AppError> {
    Ok(Json(grant_service::grant_utilization(&pool, id).await?))
}
