//! Building service.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::building::{Building, BuildingRequest},
    services::hierarchy::{self, TreeNode},
};

const ENTITY: &str = "Building";

pub async fn get_building(pool: &DbPool, id: Uuid) -> Result<Building, AppError> {
    sqlx::query_as::<_, Building>("SELECT * FROM buildings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_buildings(pool: &DbPool) -> Result<Vec<Building>, AppError> {
    Ok(
        sqlx::query_as::<_, Building>("SELECT * FROM buildings ORDER BY LOWER(name)")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn building_tree(pool: &DbPool) -> Result<Vec<TreeNode<Building>>, AppError> {
    Ok(hierarchy::build_tree(list_buildings(pool).await?))
}

/// Fail with 400 unless `id` names an existing building.
pub async fn check_building(pool: &DbPool, id: Option<Uuid>) -> Result<(), AppError> {
    let Some(id) = id else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM buildings WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Referenced building does not exist".to_string(),
        ))
    }
}

async fn check_parent(pool: &DbPool, id: Option<Uuid>, parent_id: Option<Uuid>) -> Result<(), AppError> {
    if parent_id.is_none() {
        return Ok(());
    }
    let parents = hierarchy::load_parents(pool, "buildings").await?;
    hierarchy::ensure_valid_parent(ENTITY, id, parent_id, &parents)
}

pub async fn create_building(
    pool: &DbPool,
    actor: &str,
    request: BuildingRequest,
) -> Result<Building, AppError> {
    let b = request.validate()?;
    check_parent(pool, None, b.parent_id).await?;

    let building = sqlx::query_as::<_, Building>(
        r#"
        INSERT INTO buildings (name, address, description, parent_id, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING *
        "#,
    )
    .bind(&b.name)
    .bind(&b.address)
    .bind(&b.description)
    .bind(b.parent_id)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(building_id = %building.id, name = %building.name, "building created");
    Ok(building)
}

pub async fn update_building(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: BuildingRequest,
) -> Result<Building, AppError> {
    let b = request.validate()?;
    check_parent(pool, Some(id), b.parent_id).await?;

    sqlx::query_as::<_, Building>(
        r#"
        UPDATE buildings
        SET name = $2, address = $3, description = $4, parent_id = $5,
            updated_by = $6, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&b.name)
    .bind(&b.address)
    .bind(&b.description)
    .bind(b.parent_id)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Hard delete. Refused while anything still points at the building,
/// including soft-deleted maintenance records.
pub async fn delete_building(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    get_building(pool, id).await?;

    let (children, in_use): (bool, bool) = sqlx::query_as(
        r#"
        SELECT EXISTS(SELECT 1 FROM buildings WHERE parent_id = $1),
               EXISTS(SELECT 1 FROM projects WHERE building_id = $1)
               OR EXISTS(SELECT 1 FROM work_orders WHERE building_id = $1)
               OR EXISTS(SELECT 1 FROM service_requests WHERE building_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if children {
        return Err(AppError::InvalidOperation(
            "Cannot delete a building that has sub-areas".to_string(),
        ));
    }
    if in_use {
        return Err(AppError::InvalidOperation(
            "Cannot delete a building referenced by maintenance records".to_string(),
        ));
    }

    sqlx::query("DELETE FROM buildings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(building_id = %id, "building deleted");
    Ok(())
}
