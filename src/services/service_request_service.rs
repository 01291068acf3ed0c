//! Service request service: intake, review and conversion to work orders.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        clean_optional,
        pagination::{Paged, Pagination},
        service_request::{
            ReviewRequest, ServiceRequest, ServiceRequestFilter, ServiceRequestRequest,
            ServiceRequestStatus,
        },
        work_order::{WorkOrder, WorkOrderRequest},
    },
    services::{building_service, records, work_order_service},
};

const TABLE: &str = "service_requests";
const ENTITY: &str = "Service request";

pub async fn get_request(
    pool: &DbPool,
    id: Uuid,
    include_deleted: bool,
) -> Result<ServiceRequest, AppError> {
    sqlx::query_as::<_, ServiceRequest>(
        "SELECT * FROM service_requests WHERE id = $1 AND ($2 OR NOT is_deleted)",
    )
    .bind(id)
    .bind(include_deleted)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_requests(
    pool: &DbPool,
    filter: &ServiceRequestFilter,
) -> Result<Paged<ServiceRequest>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let status = filter.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM service_requests
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR building_id = $3)
        "#,
    )
    .bind(filter.include_deleted)
    .bind(status)
    .bind(filter.building_id)
    .fetch_one(pool)
    .await?;

    let requests = sqlx::query_as::<_, ServiceRequest>(
        r#"
        SELECT * FROM service_requests
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR building_id = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.include_deleted)
    .bind(status)
    .bind(filter.building_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(requests, pagination, total))
}

/// File a new request in `submitted` status.
pub async fn submit_request(
    pool: &DbPool,
    actor: &str,
    request: ServiceRequestRequest,
) -> Result<ServiceRequest, AppError> {
    let r = request.validate()?;
    building_service::check_building(pool, r.building_id).await?;

    let created = sqlx::query_as::<_, ServiceRequest>(
        r#"
        INSERT INTO service_requests (
            title, description, building_id, requested_by, contact_email, priority,
            status, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'submitted', $7, $7)
        RETURNING *
        "#,
    )
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.building_id)
    .bind(&r.requested_by)
    .bind(&r.contact_email)
    .bind(r.priority.as_str())
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(service_request_id = %created.id, "service request submitted");
    Ok(created)
}

/// Edit a request that has not been decided yet. Editing moves a submitted
/// request to `under_review`.
pub async fn update_request(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: ServiceRequestRequest,
) -> Result<ServiceRequest, AppError> {
    let r = request.validate()?;
    let existing = get_request(pool, id, false).await?;
    if !existing.status.is_reviewable() {
        return Err(AppError::InvalidOperation(format!(
            "Cannot edit a service request that is {}",
            existing.status
        )));
    }
    building_service::check_building(pool, r.building_id).await?;

    sqlx::query_as::<_, ServiceRequest>(
        r#"
        UPDATE service_requests
        SET title = $2, description = $3, building_id = $4, requested_by = $5,
            contact_email = $6, priority = $7, status = 'under_review',
            updated_by = $8, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted AND status IN ('submitted', 'under_review')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.building_id)
    .bind(&r.requested_by)
    .bind(&r.contact_email)
    .bind(r.priority.as_str())
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::stale(ENTITY))
}

/// Approve or reject a pending request.
pub async fn review_request(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    review: ReviewRequest,
) -> Result<ServiceRequest, AppError> {
    let existing = get_request(pool, id, false).await?;
    if !existing.status.is_reviewable() {
        return Err(AppError::InvalidOperation(format!(
            "Service request is already {}",
            existing.status
        )));
    }

    let note = clean_optional(review.note);
    let status = if review.approve {
        ServiceRequestStatus::Approved
    } else {
        if note.is_none() {
            return Err(AppError::InvalidRequest(
                "A note is required when rejecting a request".to_string(),
            ));
        }
        ServiceRequestStatus::Rejected
    };

    let reviewed = sqlx::query_as::<_, ServiceRequest>(
        r#"
        UPDATE service_requests
        SET status = $2, review_note = $3, updated_by = $4, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted AND status IN ('submitted', 'under_review')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(&note)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::stale(ENTITY))?;

    tracing::info!(service_request_id = %id, status = %status, actor, "service request reviewed");
    Ok(reviewed)
}

/// Turn an approved request into an open work order. Each request converts
/// at most once.
pub async fn convert_to_work_order(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
) -> Result<WorkOrder, AppError> {
    let mut tx = pool.begin().await?;

    let request = sqlx::query_as::<_, ServiceRequest>(
        "SELECT * FROM service_requests WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    if request.work_order_id.is_some() {
        return Err(AppError::InvalidOperation(
            "Service request has already been converted".to_string(),
        ));
    }
    if request.status != ServiceRequestStatus::Approved {
        return Err(AppError::InvalidOperation(format!(
            "Only approved requests can be converted; this one is {}",
            request.status
        )));
    }

    let order = work_order_service::insert_work_order(
        &mut tx,
        actor,
        &WorkOrderRequest {
            title: request.title.clone(),
            description: Some(format!(
                "{}\n\nRequested by {}",
                request.description, request.requested_by
            )),
            building_id: request.building_id,
            project_id: None,
            priority: request.priority,
            assigned_to: None,
            estimated_cost_cents: None,
            actual_cost_cents: None,
            due_date: None,
        },
    )
    .await?;

    sqlx::query(
        "UPDATE service_requests SET work_order_id = $2, updated_by = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(order.id)
    .bind(actor)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(service_request_id = %id, work_order_id = %order.id, "service request converted");
    Ok(order)
}

pub async fn delete_request(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    records::soft_delete(pool, TABLE, ENTITY, id, actor).await
}

pub async fn restore_request(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
) -> Result<ServiceRequest, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_request(pool, id, false).await
}
