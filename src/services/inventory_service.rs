//! Inventory service: items, stock adjustments and adjustment history.
//!
//! Stock changes lock the item row, check the new quantity and write the
//! adjustment record in one database transaction, so concurrent removals
//! cannot take the quantity below zero.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        inventory::{
            apply_change, AdjustmentRequest, CreateInventoryItemRequest, InventoryAdjustment,
            InventoryFilter, InventoryItem, InventoryItemRequest,
        },
        pagination::{Paged, Pagination},
    },
    services::records,
};

const TABLE: &str = "inventory_items";
const ENTITY: &str = "Inventory item";

pub async fn get_item(
    pool: &DbPool,
    id: Uuid,
    include_deleted: bool,
) -> Result<InventoryItem, AppError> {
    sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory_items WHERE id = $1 AND ($2 OR NOT is_deleted)",
    )
    .bind(id)
    .bind(include_deleted)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_items(
    pool: &DbPool,
    filter: &InventoryFilter,
) -> Result<Paged<InventoryItem>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let pattern = records::like_pattern(filter.search.as_deref());

    const WHERE: &str = r#"
        WHERE ($1 OR NOT is_deleted)
          AND ($2::uuid IS NULL OR location_id = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR sku ILIKE $3 OR category ILIKE $3)
          AND (NOT $4 OR (reorder_level IS NOT NULL AND quantity <= reorder_level))
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM inventory_items {WHERE}"))
        .bind(filter.include_deleted)
        .bind(filter.location_id)
        .bind(&pattern)
        .bind(filter.low_stock)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT * FROM inventory_items {WHERE} ORDER BY LOWER(name), id LIMIT $5 OFFSET $6"
    ))
    .bind(filter.include_deleted)
    .bind(filter.location_id)
    .bind(&pattern)
    .bind(filter.low_stock)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(items, pagination, total))
}

async fn check_location(pool: &DbPool, location_id: Option<Uuid>) -> Result<(), AppError> {
    let Some(id) = location_id else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Referenced location does not exist".to_string(),
        ))
    }
}

async fn record_adjustment(
    conn: &mut PgConnection,
    actor: &str,
    item_id: Uuid,
    change: i32,
    after: i32,
    reason: &str,
) -> Result<InventoryAdjustment, AppError> {
    Ok(sqlx::query_as::<_, InventoryAdjustment>(
        r#"
        INSERT INTO inventory_adjustments
            (inventory_item_id, quantity_change, quantity_after, reason, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(change)
    .bind(after)
    .bind(reason)
    .bind(actor)
    .fetch_one(conn)
    .await?)
}

/// Create an item. A positive starting quantity is logged as the first
/// adjustment.
pub async fn create_item(
    pool: &DbPool,
    actor: &str,
    request: CreateInventoryItemRequest,
) -> Result<InventoryItem, AppError> {
    if request.initial_quantity < 0 {
        return Err(AppError::InvalidRequest(
            "initial_quantity cannot be negative".to_string(),
        ));
    }
    let quantity = request.initial_quantity;
    let i = request.item.validate()?;
    check_location(pool, i.location_id).await?;

    let mut tx = pool.begin().await?;

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        INSERT INTO inventory_items (
            name, sku, description, category, location_id, quantity, unit,
            unit_cost_cents, reorder_level, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(&i.name)
    .bind(&i.sku)
    .bind(&i.description)
    .bind(&i.category)
    .bind(i.location_id)
    .bind(quantity)
    .bind(&i.unit)
    .bind(i.unit_cost_cents)
    .bind(i.reorder_level)
    .bind(actor)
    .fetch_one(&mut *tx)
    .await?;

    if quantity > 0 {
        record_adjustment(&mut tx, actor, item.id, quantity, quantity, "Initial stock").await?;
    }

    tx.commit().await?;

    tracing::info!(item_id = %item.id, name = %item.name, quantity, "inventory item created");
    Ok(item)
}

/// Replace the descriptive fields of an item. Quantity is untouched.
pub async fn update_item(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: InventoryItemRequest,
) -> Result<InventoryItem, AppError> {
    let i = request.validate()?;
    check_location(pool, i.location_id).await?;

    sqlx::query_as::<_, InventoryItem>(
        r#"
        UPDATE inventory_items
        SET name = $2, sku = $3, description = $4, category = $5, location_id = $6,
            unit = $7, unit_cost_cents = $8, reorder_level = $9,
            updated_by = $10, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&i.name)
    .bind(&i.sku)
    .bind(&i.description)
    .bind(&i.category)
    .bind(i.location_id)
    .bind(&i.unit)
    .bind(i.unit_cost_cents)
    .bind(i.reorder_level)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

pub async fn delete_item(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    records::soft_delete(pool, TABLE, ENTITY, id, actor).await
}

pub async fn restore_item(pool: &DbPool, actor: &str, id: Uuid) -> Result<InventoryItem, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_item(pool, id, false).await
}

/// Add or remove stock.
///
/// # Errors
///
/// * `NotFound` - the item does not exist or is deleted
/// * `InsufficientBalance` - the removal exceeds the quantity on hand
pub async fn adjust_stock(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: AdjustmentRequest,
) -> Result<InventoryAdjustment, AppError> {
    let a = request.validate()?;

    let mut tx = pool.begin().await?;

    let current: i32 = sqlx::query_scalar(
        "SELECT quantity FROM inventory_items WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    let after = apply_change(current, a.quantity_change)?;

    sqlx::query(
        "UPDATE inventory_items SET quantity = $2, updated_by = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(after)
    .bind(actor)
    .execute(&mut *tx)
    .await?;

    let adjustment =
        record_adjustment(&mut tx, actor, id, a.quantity_change, after, &a.reason).await?;

    tx.commit().await?;

    tracing::info!(
        item_id = %id,
        change = a.quantity_change,
        quantity = after,
        actor,
        "inventory adjusted"
    );
    Ok(adjustment)
}

/// Adjustment history for one item, newest first.
pub async fn list_adjustments(
    pool: &DbPool,
    id: Uuid,
) -> Result<Vec<InventoryAdjustment>, AppError> {
    get_item(pool, id, true).await?;

    Ok(sqlx::query_as::<_, InventoryAdjustment>(
        r#"
        SELECT * FROM inventory_adjustments
        WHERE inventory_item_id = $1
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?)
}
