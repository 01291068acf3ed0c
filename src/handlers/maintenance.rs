//! Building maintenance HTTP handlers: buildings, projects, work orders and
//! service requests.

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
        building::{Building, BuildingRequest},
        pagination::Paged,
        project::{Project, ProjectFilter, ProjectRequest},
        service_request::{ReviewRequest, ServiceRequest, ServiceRequestFilter, ServiceRequestRequest},
        work_order::{StatusChangeRequest, WorkOrder, WorkOrderFilter, WorkOrderRequest},
    },
    services::{
        building_service, hierarchy::TreeNode, project_service, service_request_service,
        work_order_service,
    },
};

// Buildings

pub async fn create_building(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BuildingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let building = building_service::create_building(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(building)))
}

pub async fn list_buildings(State(pool): State<DbPool>) -> Result<Json<Vec<Building>>, AppError> {
    Ok(Json(building_service::list_buildings(&pool).await?))
}

pub async fn building_tree(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<TreeNode<Building>>>, AppError> {
    Ok(Json(building_service::building_tree(&pool).await?))
}

pub async fn get_building(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Building>, AppError> {
    Ok(Json(building_service::get_building(&pool, id).await?))
}

pub async fn update_building(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<BuildingRequest>,
) -> Result<Json<Building>, AppError> {
    Ok(Json(
        building_service::update_building(&pool, &auth.user_name, id, request).await?,
    ))
}

/// Returns 400 while sub-areas or maintenance records reference the building.
pub async fn delete_building(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    building_service::delete_building(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Projects

pub async fn create_project(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_service::create_project(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(pool): State<DbPool>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Paged<Project>>, AppError> {
    Ok(Json(project_service::list_projects(&pool, &filter).await?))
}

pub async fn get_project(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(
        project_service::get_project(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_project(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(
        project_service::update_project(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_project(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    project_service::delete_project(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_project(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(
        project_service::restore_project(&pool, &auth.user_name, id).await?,
    ))
}

// Work orders

pub async fn create_work_order(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WorkOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = work_order_service::create_work_order(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List work orders. `overdue=true` keeps unfinished orders past their due
/// date.
pub async fn list_work_orders(
    State(pool): State<DbPool>,
    Query(filter): Query<WorkOrderFilter>,
) -> Result<Json<Paged<WorkOrder>>, AppError> {
    Ok(Json(
        work_order_service::list_work_orders(&pool, &filter).await?,
    ))
}

pub async fn get_work_order(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<WorkOrder>, AppError> {
    Ok(Json(
        work_order_service::get_work_order(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_work_order(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<WorkOrderRequest>,
) -> Result<Json<WorkOrder>, AppError> {
    Ok(Json(
        work_order_service::update_work_order(&pool, &auth.user_name, id, request).await?,
    ))
}

/// Change status.
///
/// ```json
/// { "status": "completed", "actual_cost_cents": 42000 }
/// ```
///
/// Returns 400 when the lifecycle does not allow the move.
pub async fn change_work_order_status(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<WorkOrder>, AppError> {
    Ok(Json(
        work_order_service::change_status(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_work_order(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    work_order_service::delete_work_order(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_work_order(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkOrder>, AppError> {
    Ok(Json(
        work_order_service::restore_work_order(&pool, &auth.user_name, id).await?,
    ))
}

// Service requests

pub async fn submit_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ServiceRequestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = service_request_service::submit_request(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_service_requests(
    State(pool): State<DbPool>,
    Query(filter): Query<ServiceRequestFilter>,
) -> Result<Json<Paged<ServiceRequest>>, AppError> {
    Ok(Json(
        service_request_service::list_requests(&pool, &filter).await?,
    ))
}

pub async fn get_service_request(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(
        service_request_service::get_request(&pool, id, params.include_deleted).await?,
    ))
}

pub async fn update_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<ServiceRequestRequest>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(
        service_request_service::update_request(&pool, &auth.user_name, id, request).await?,
    ))
}

/// Approve or reject.
///
/// ```json
/// { "approve": false, "note": "Covered by the landlord" }
/// ```
pub async fn review_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewRequest>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(
        service_request_service::review_request(&pool, &auth.user_name, id, review).await?,
    ))
}

/// Create a work order from an approved request. Returns 201 with the work
/// order, 400 if the request is not approved or was already converted.
pub async fn convert_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order =
        service_request_service::convert_to_work_order(&pool, &auth.user_name, id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn delete_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service_request_service::delete_request(&pool, &auth.user_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_service_request(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(
        service_request_service::restore_request(&pool, &auth.user_name, id).await?,
    ))
}
