//! Donor HTTP handlers.
//!
//! - POST /api/v1/donors
//! - GET /api/v1/donors?search=&donor_type=&page=
//! - GET /api/v1/donors/{id}
//! - PUT /api/v1/donors/{id}
//! - DELETE /api/v1/donors/{id}
//! - POST /api/v1/donors/{id}/restore
//! - GET /api/v1/donors/{id}/giving - Lifetime giving summary

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
        DeletedParam,
        donor::{Donor, DonorFilter, DonorRequest, GivingSummary},
        pagination::Paged,
    },
    services::donor_service,
};

pub async fn create_donor(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DonorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let donor = donor_service::create_donor(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(donor)))
}

pub async fn list_donors(
    State(pool): State<DbPool>,
    Query(filter): Query<DonorFilter>,
) -> Result<Json<Paged<Donor>>, AppError> {
    Ok(Json(donor_service::list_donors(&pool, &filter).await?))
}

pub async fn get_donor(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<Donor>, AppError> {
    Ok(Json(
        donor_service::get_donor(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_donor(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<DonorRequest>,
) -> Result<Json<Donor>, AppError> {
    Ok(Json(
        donor_service::update_donor(&pool, &auth.user_name, id, request).await?,
    ))
}

/// Soft-delete a donor. Returns 400 while the donor has active recurring
/// gifts.
pub async fn delete_donor(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    donor_service::delete_donor(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_donor(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Donor>, AppError> {
    Ok(Json(
        donor_service::restore_donor(&pool, &auth.user_name, id).await?,
    ))
}

pub async fn giving_summary(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<GivingSummary>, AppError> {
    Ok(Json(donor_service::giving_summary(&pool, id).await?))
}
