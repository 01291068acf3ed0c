//! Category HTTP handlers.
//!
//! - POST /api/v1/categories - Create category
//! - GET /api/v1/categories - List categories (flat)
//! - GET /api/v1/categories/tree - Categories as nested tree
//! - GET /api/v1/categories/{id} - Get category
//! - PUT /api/v1/categories/{id} - Replace category
//! - DELETE /api/v1/categories/{id} - Delete unused category

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
    models::category::{Category, CategoryFilter, CategoryRequest},
    services::{category_service, hierarchy::TreeNode},
};

/// Create a category.
///
/// ```json
/// { "name": "Electric", "category_type": "expense", "parent_id": "..." }
/// ```
///
/// Returns 201 with the created category, 400 if the parent is missing,
/// of another type, or would create a cycle.
pub async fn create_category(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = category_service::create_category(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(pool): State<DbPool>,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(category_service::list_categories(&pool, &filter).await?))
}

/// Categories nested under their parents, siblings ordered by name.
pub async fn category_tree(
    State(pool): State<DbPool>,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<TreeNode<Category>>>, AppError> {
    Ok(Json(category_service::category_tree(&pool, &filter).await?))
}

pub async fn get_category(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(category_service::get_category(&pool, id).await?))
}

pub async fn update_category(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let category = category_service::update_category(&pool, &auth.user_name, id, request).await?;
    Ok(Json(category))
}

/// Delete a category.
///
/// Returns 204, or 400 when the category still has subcategories or any
/// transactions.
pub async fn delete_category(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    category_service::delete_category(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
