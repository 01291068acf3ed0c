//! Project service.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::{Paged, Pagination},
        project::{Project, ProjectFilter, ProjectRequest},
    },
    services::{building_service, records},
};

const TABLE: &str = "projects";
const ENTITY: &str = "Project";

pub async fn get_project(pool: &DbPool, id: Uuid, include_deleted: bool) -> Result<Project, AppError> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND ($2 OR NOT is_deleted)")
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_projects(pool: &DbPool, filter: &ProjectFilter) -> Result<Paged<Project>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let status = filter.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM projects
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

    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT * FROM projects
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR building_id = $3)
        ORDER BY target_date NULLS LAST, LOWER(name)
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

    Ok(Paged::new(projects, pagination, total))
}

pub async fn create_project(
    pool: &DbPool,
    actor: &str,
    request: ProjectRequest,
) -> Result<Project, AppError> {
    let p = request.validate()?;
    building_service::check_building(pool, p.building_id).await?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (
            name, description, building_id, status, priority, budget_cents,
            start_date, target_date, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING *
        "#,
    )
    .bind(&p.name)
    .bind(&p.description)
    .bind(p.building_id)
    .bind(p.status.as_str())
    .bind(p.priority.as_str())
    .bind(p.budget_cents)
    .bind(p.start_date)
    .bind(p.target_date)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(project_id = %project.id, name = %project.name, "project created");
    Ok(project)
}

pub async fn update_project(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: ProjectRequest,
) -> Result<Project, AppError> {
    let p = request.validate()?;
    building_service::check_building(pool, p.building_id).await?;

    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET name = $2, description = $3, building_id = $4, status = $5, priority = $6,
            budget_cents = $7, start_date = $8, target_date = $9,
            updated_by = $10, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&p.name)
    .bind(&p.description)
    .bind(p.building_id)
    .bind(p.status.as_str())
    .bind(p.priority.as_str())
    .bind(p.budget_cents)
    .bind(p.start_date)
    .bind(p.target_date)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Soft delete, refused while the project has unfinished work orders.
pub async fn delete_project(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    let open_work: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM work_orders
            WHERE project_id = $1 AND NOT is_deleted
              AND status NOT IN ('completed', 'cancelled')
        )
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if open_work {
        return Err(AppError::InvalidOperation(
            "Cannot delete a project with open work orders".to_string(),
        ));
    }

    records::soft_delete(pool, TABLE, ENTITY, id, actor).await
}

pub async fn restore_project(pool: &DbPool, actor: &str, id: Uuid) -> Result<Project, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_project(pool, id, false).await
}
