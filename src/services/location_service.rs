//! Location service: CRUD plus tree rules.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::location::{Location, LocationRequest},
    services::hierarchy::{self, TreeNode},
};

const ENTITY: &str = "Location";

pub async fn get_location(pool: &DbPool, id: Uuid) -> Result<Location, AppError> {
    sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_locations(pool: &DbPool) -> Result<Vec<Location>, AppError> {
    Ok(
        sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY LOWER(name)")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn location_tree(pool: &DbPool) -> Result<Vec<TreeNode<Location>>, AppError> {
    Ok(hierarchy::build_tree(list_locations(pool).await?))
}

async fn check_parent(pool: &DbPool, id: Option<Uuid>, parent_id: Option<Uuid>) -> Result<(), AppError> {
    if parent_id.is_none() {
        return Ok(());
    }
    let parents = hierarchy::load_parents(pool, "locations").await?;
    hierarchy::ensure_valid_parent(ENTITY, id, parent_id, &parents)
}

pub async fn create_location(
    pool: &DbPool,
    actor: &str,
    request: LocationRequest,
) -> Result<Location, AppError> {
    let request = request.validate()?;
    check_parent(pool, None, request.parent_id).await?;

    let location = sqlx::query_as::<_, Location>(
        r#"
        INSERT INTO locations (name, description, parent_id, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.parent_id)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(location_id = %location.id, name = %location.name, "location created");
    Ok(location)
}

pub async fn update_location(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: LocationRequest,
) -> Result<Location, AppError> {
    let request = request.validate()?;
    check_parent(pool, Some(id), request.parent_id).await?;

    sqlx::query_as::<_, Location>(
        r#"
        UPDATE locations
        SET name = $2, description = $3, parent_id = $4, updated_by = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.parent_id)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Hard delete of an empty location.
pub async fn delete_location(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    get_location(pool, id).await?;

    let (children, items): (bool, bool) = sqlx::query_as(
        r#"
        SELECT EXISTS(SELECT 1 FROM locations WHERE parent_id = $1),
               EXISTS(SELECT 1 FROM inventory_items WHERE location_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if children {
        return Err(AppError::InvalidOperation(
            "Cannot delete a location that has sub-locations".to_string(),
        ));
    }
    if items {
        return Err(AppError::InvalidOperation(
            "Cannot delete a location that holds inventory items".to_string(),
        ));
    }

    sqlx::query("DELETE FROM locations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(location_id = %id, "location deleted");
    Ok(())
}
