//! Category service: CRUD plus tree rules.
//!
//! # Rules
//!
//! - A parent must exist and have the same category type
//! - A category cannot be moved under itself or a descendant
//! - A category with children or transactions cannot be deleted

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::category::{Category, CategoryFilter, CategoryRequest},
    services::hierarchy::{self, TreeNode},
};

/// Fetch a category or fail with 404.
pub async fn get_category(pool: &DbPool, id: Uuid) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Category"))
}

/// List categories ordered by name.
pub async fn list_categories(
    pool: &DbPool,
    filter: &CategoryFilter,
) -> Result<Vec<Category>, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT * FROM categories
        WHERE ($1::text IS NULL OR category_type = $1)
          AND ($2 OR is_active)
        ORDER BY LOWER(name)
        "#,
    )
    .bind(filter.category_type.map(|t| t.as_str()))
    .bind(filter.include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// All categories of the filter's type assembled into a tree.
pub async fn category_tree(
    pool: &DbPool,
    filter: &CategoryFilter,
) -> Result<Vec<TreeNode<Category>>, AppError> {
    let categories = list_categories(pool, filter).await?;
    Ok(hierarchy::build_tree(categories))
}

/// Parent must exist, share the type, and not be a descendant of `id`.
async fn check_parent(
    pool: &DbPool,
    id: Option<Uuid>,
    request: &CategoryRequest,
) -> Result<(), AppError> {
    let Some(parent_id) = request.parent_id else {
        return Ok(());
    };

    let parents = hierarchy::load_parents(pool, "categories").await?;
    hierarchy::ensure_valid_parent("Category", id, Some(parent_id), &parents)?;

    let parent = get_category(pool, parent_id).await?;
    if parent.category_type != request.category_type {
        return Err(AppError::InvalidRequest(format!(
            "Parent category is {} but this category is {}",
            parent.category_type, request.category_type
        )));
    }

    Ok(())
}

pub async fn create_category(
    pool: &DbPool,
    actor: &str,
    request: CategoryRequest,
) -> Result<Category, AppError> {
    let request = request.validate()?;
    check_parent(pool, None, &request).await?;

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (
            name, description, category_type, parent_id, color, is_active, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.category_type.as_str())
    .bind(request.parent_id)
    .bind(&request.color)
    .bind(request.is_active)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(category_id = %category.id, name = %category.name, "category created");
    Ok(category)
}

/// Replace a category.
///
/// Changing the type is refused once transactions reference the category,
/// since their type must match it.
pub async fn update_category(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: CategoryRequest,
) -> Result<Category, AppError> {
    let request = request.validate()?;
    let existing = get_category(pool, id).await?;
    check_parent(pool, Some(id), &request).await?;

    if existing.category_type != request.category_type {
        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM transactions WHERE category_id = $1)
                OR EXISTS(SELECT 1 FROM recurring_transactions WHERE category_id = $1 AND is_active)
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        let has_children: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        if in_use || has_children {
            return Err(AppError::InvalidOperation(
                "Cannot change the type of a category used by transactions, \
                 active recurring transactions or subcategories"
                    .to_string(),
            ));
        }
    }

    let category = sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories
        SET name = $2,
            description = $3,
            category_type = $4,
            parent_id = $5,
            color = $6,
            is_active = $7,
            updated_by = $8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.category_type.as_str())
    .bind(request.parent_id)
    .bind(&request.color)
    .bind(request.is_active)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Category"))?;

    Ok(category)
}

/// Hard delete. Categories are reference data; history lives on transactions,
/// so any transaction (even soft-deleted) blocks the delete.
pub async fn delete_category(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    get_category(pool, id).await?;

    let has_children: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE parent_id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if has_children {
        return Err(AppError::InvalidOperation(
            "Cannot delete a category that has subcategories".to_string(),
        ));
    }

    let transaction_count: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM transactions WHERE category_id = $1)
             + (SELECT COUNT(*) FROM recurring_transactions WHERE category_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if transaction_count > 0 {
        return Err(AppError::InvalidOperation(format!(
            "Cannot delete a category used by {transaction_count} transaction(s)"
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(category_id = %id, "category deleted");
    Ok(())
}
