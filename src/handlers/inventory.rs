//! Location and inventory HTTP handlers.
//!
//! - /api/v1/locations, /api/v1/locations/tree, /api/v1/locations/{id}
//! - /api/v1/inventory, /api/v1/inventory/{id}, /api/v1/inventory/{id}/restore
//! - POST/GET /api/v1/inventory/{id}/adjustments - Change stock / history

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
        inventory::{
            AdjustmentRequest, CreateInventoryItemRequest, InventoryAdjustment, InventoryFilter,
            InventoryItem, InventoryItemRequest,
        },
        location::{Location, LocationRequest},
        pagination::Paged,
    },
    services::{hierarchy::TreeNode, inventory_service, location_service},
};

pub async fn create_location(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<LocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let location = location_service::create_location(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn list_locations(State(pool): State<DbPool>) -> Result<Json<Vec<Location>>, AppError> {
    Ok(Json(location_service::list_locations(&pool).await?))
}

pub async fn location_tree(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<TreeNode<Location>>>, AppError> {
    Ok(Json(location_service::location_tree(&pool).await?))
}

pub async fn get_location(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(location_service::get_location(&pool, id).await?))
}

pub async fn update_location(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(
        location_service::update_location(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_location(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    location_service::delete_location(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create an item.
///
/// ```json
/// { "name": "Folding chair", "sku": "FC-01", "initial_quantity": 40, "reorder_level": 10 }
/// ```
pub async fn create_item(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateInventoryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = inventory_service::create_item(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List items. `low_stock=true` keeps only items at or below their reorder
/// level.
pub async fn list_items(
    State(pool): State<DbPool>,
    Query(filter): Query<InventoryFilter>,
) -> Result<Json<Paged<InventoryItem>>, AppError> {
    Ok(Json(inventory_service::list_items(&pool, &filter).await?))
}

pub async fn get_item(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(
        inventory_service::get_item(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_item(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<InventoryItemRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(
        inventory_service::update_item(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_item(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    inventory_service::delete_item(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_item(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(
        inventory_service::restore_item(&pool, &auth.user_name, id).await?,
    ))
}

/// Add (positive) or remove (negative) stock.
///
/// Returns 201 with the adjustment record, 422 if removing more than is on
/// hand.
pub async fn adjust_stock(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let adjustment = inventory_service::adjust_stock(&pool, &auth.user_name, id, request).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn list_adjustments(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InventoryAdjustment>>, AppError> {
    Ok(Json(inventory_service::list_adjustments(&pool, id).await?))
}
