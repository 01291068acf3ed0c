//! Work order service.
//!
//! Status only changes through [`change_status`], which enforces the
//! lifecycle in [`WorkOrderStatus::can_transition_to`].

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::{Paged, Pagination},
        work_order::{
            StatusChangeRequest, WorkOrder, WorkOrderFilter, WorkOrderRequest, WorkOrderStatus,
        },
    },
    services::{building_service, records},
};

const TABLE: &str = "work_orders";
const ENTITY: &str = "Work order";

const LIST_FILTER: &str = r#"
    WHERE ($1 OR NOT is_deleted)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::text IS NULL OR priority = $3)
      AND ($4::uuid IS NULL OR building_id = $4)
      AND ($5::uuid IS NULL OR project_id = $5)
      AND ($6::text IS NULL OR assigned_to = $6)
      AND (NOT $7 OR (due_date < $8 AND status NOT IN ('completed', 'cancelled')))
"#;

pub async fn get_work_order(
    pool: &DbPool,
    id: Uuid,
    include_deleted: bool,
) -> Result<WorkOrder, AppError> {
    sqlx::query_as::<_, WorkOrder>(
        "SELECT * FROM work_orders WHERE id = $1 AND ($2 OR NOT is_deleted)",
    )
    .bind(id)
    .bind(include_deleted)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Paged work orders, most urgent first.
pub async fn list_work_orders(
    pool: &DbPool,
    filter: &WorkOrderFilter,
) -> Result<Paged<WorkOrder>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let status = filter.status.map(|s| s.as_str());
    let priority = filter.priority.map(|p| p.as_str());
    let today = Utc::now().date_naive();

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM work_orders {LIST_FILTER}"))
        .bind(filter.include_deleted)
        .bind(status)
        .bind(priority)
        .bind(filter.building_id)
        .bind(filter.project_id)
        .bind(&filter.assigned_to)
        .bind(filter.overdue)
        .bind(today)
        .fetch_one(pool)
        .await?;

    let orders = sqlx::query_as::<_, WorkOrder>(&format!(
        r#"
        SELECT * FROM work_orders {LIST_FILTER}
        ORDER BY CASE priority
                     WHEN 'urgent' THEN 0 WHEN 'high' THEN 1
                     WHEN 'medium' THEN 2 ELSE 3
                 END,
                 due_date NULLS LAST, created_at
        LIMIT $9 OFFSET $10
        "#
    ))
    .bind(filter.include_deleted)
    .bind(status)
    .bind(priority)
    .bind(filter.building_id)
    .bind(filter.project_id)
    .bind(&filter.assigned_to)
    .bind(filter.overdue)
    .bind(today)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(orders, pagination, total))
}

async fn check_project(pool: &DbPool, project_id: Option<Uuid>) -> Result<(), AppError> {
    let Some(id) = project_id else {
        return Ok(());
    };
    if records::exists_live(pool, "projects", id).await? {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Referenced project does not exist".to_string(),
        ))
    }
}

/// Insert an open work order. Shared with service request conversion.
pub(crate) async fn insert_work_order(
    conn: &mut PgConnection,
    actor: &str,
    w: &WorkOrderRequest,
) -> Result<WorkOrder, AppError> {
    Ok(sqlx::query_as::<_, WorkOrder>(
        r#"
        INSERT INTO work_orders (
            title, description, building_id, project_id, status, priority, assigned_to,
            estimated_cost_cents, actual_cost_cents, due_date, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, 'open', $5, $6, $7, $8, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(&w.title)
    .bind(&w.description)
    .bind(w.building_id)
    .bind(w.project_id)
    .bind(w.priority.as_str())
    .bind(&w.assigned_to)
    .bind(w.estimated_cost_cents)
    .bind(w.actual_cost_cents)
    .bind(w.due_date)
    .bind(actor)
    .fetch_one(conn)
    .await?)
}

pub async fn create_work_order(
    pool: &DbPool,
    actor: &str,
    request: WorkOrderRequest,
) -> Result<WorkOrder, AppError> {
    let w = request.validate()?;
    building_service::check_building(pool, w.building_id).await?;
    check_project(pool, w.project_id).await?;

    let mut conn = pool.acquire().await?;
    let order = insert_work_order(&mut conn, actor, &w).await?;

    tracing::info!(work_order_id = %order.id, priority = %order.priority, "work order created");
    Ok(order)
}

pub async fn update_work_order(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: WorkOrderRequest,
) -> Result<WorkOrder, AppError> {
    let w = request.validate()?;
    building_service::check_building(pool, w.building_id).await?;
    check_project(pool, w.project_id).await?;

    sqlx::query_as::<_, WorkOrder>(
        r#"
        UPDATE work_orders
        SET title = $2, description = $3, building_id = $4, project_id = $5, priority = $6,
            assigned_to = $7, estimated_cost_cents = $8, actual_cost_cents = $9,
            due_date = $10, updated_by = $11, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&w.title)
    .bind(&w.description)
    .bind(w.building_id)
    .bind(w.project_id)
    .bind(w.priority.as_str())
    .bind(&w.assigned_to)
    .bind(w.estimated_cost_cents)
    .bind(w.actual_cost_cents)
    .bind(w.due_date)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Move a work order to a new status.
///
/// Completing stamps `completed_at` and records the actual cost if given.
///
/// # Errors
///
/// * `NotFound` - the order does not exist or is deleted
/// * `InvalidOperation` - the lifecycle does not allow the move
pub async fn change_status(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: StatusChangeRequest,
) -> Result<WorkOrder, AppError> {
    if matches!(request.actual_cost_cents, Some(c) if c < 0) {
        return Err(AppError::InvalidRequest(
            "actual_cost_cents cannot be negative".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let current: WorkOrderStatus = sqlx::query_scalar::<_, String>(
        "SELECT status FROM work_orders WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?
    .parse()?;

    let next = request.status;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidOperation(format!(
            "Cannot move a work order from {current} to {next}"
        )));
    }
    let completing = next == WorkOrderStatus::Completed;

    let order = sqlx::query_as::<_, WorkOrder>(
        r#"
        UPDATE work_orders
        SET status = $2,
            completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END,
            actual_cost_cents = CASE WHEN $3 THEN COALESCE($4, actual_cost_cents)
                                     ELSE actual_cost_cents END,
            updated_by = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(next.as_str())
    .bind(completing)
    .bind(request.actual_cost_cents)
    .bind(actor)
    .fetch_one(&mut *tx)
    .await?;

    // A request converted into this order is done when the order is.
    if completing {
        sqlx::query(
            r#"
            UPDATE service_requests
            SET status = 'completed', updated_by = $2, updated_at = NOW()
            WHERE work_order_id = $1 AND status = 'approved'
            "#,
        )
        .bind(id)
        .bind(actor)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(work_order_id = %id, from = %current, to = %next, actor, "work order status changed");
    Ok(order)
}

pub async fn delete_work_order(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    records::soft_delete(pool, TABLE, ENTITY, id, actor).await
}

pub async fn restore_work_order(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
) -> Result<WorkOrder, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_work_order(pool, id, false).await
}
