//! Grant service.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        grant::{Grant, GrantFilter, GrantRequest, GrantUtilization, UpdateGrantRequest},
        pagination::{Paged, Pagination},
    },
    services::records,
};

const TABLE: &str = "grants";
const ENTITY: &str = "Grant";

pub async fn get_grant(pool: &DbPool, id: Uuid, include_deleted: bool) -> Result<Grant, AppError> {
    sqlx::query_as::<_, Grant>("SELECT * FROM grants WHERE id = $1 AND ($2 OR NOT is_deleted)")
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

/// Paged grants, latest start date first.
pub async fn list_grants(pool: &DbPool, filter: &GrantFilter) -> Result<Paged<Grant>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let status = filter.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM grants
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR fund_id = $3)
        "#,
    )
    .bind(filter.include_deleted)
    .bind(status)
    .bind(filter.fund_id)
    .fetch_one(pool)
    .await?;

    let grants = sqlx::query_as::<_, Grant>(
        r#"
        SELECT * FROM grants
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR fund_id = $3)
        ORDER BY start_date DESC, name
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.include_deleted)
    .bind(status)
    .bind(filter.fund_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(grants, pagination, total))
}

async fn check_fund(pool: &DbPool, fund_id: Option<Uuid>) -> Result<(), AppError> {
    match fund_id {
        Some(fund_id) if !records::exists_live(pool, "funds", fund_id).await? => Err(
            AppError::InvalidRequest("Referenced fund does not exist".to_string()),
        ),
        _ => Ok(()),
    }
}

pub async fn create_grant(
    pool: &DbPool,
    actor: &str,
    request: GrantRequest,
) -> Result<Grant, AppError> {
    let g = request.validate()?;
    check_fund(pool, g.fund_id).await?;

    let grant = sqlx::query_as::<_, Grant>(
        r#"
        INSERT INTO grants (
            name, grantor, amount_cents, start_date, end_date, status, fund_id, notes,
            created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING *
        "#,
    )
    .bind(&g.name)
    .bind(&g.grantor)
    .bind(g.amount_cents)
    .bind(g.start_date)
    .bind(g.end_date)
    .bind(g.status.as_str())
    .bind(g.fund_id)
    .bind(&g.notes)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(grant_id = %grant.id, amount_cents = grant.amount_cents, "grant created");
    Ok(grant)
}

pub async fn update_grant(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: UpdateGrantRequest,
) -> Result<Grant, AppError> {
    let version = request.version;
    let g = request.grant.validate()?;
    check_fund(pool, g.fund_id).await?;

    let updated = sqlx::query_as::<_, Grant>(
        r#"
        UPDATE grants
        SET name = $3, grantor = $4, amount_cents = $5, start_date = $6, end_date = $7,
            status = $8, fund_id = $9, notes = $10, updated_by = $11,
            updated_at = NOW(), version = version + 1
        WHERE id = $1 AND version = $2 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(version)
    .bind(&g.name)
    .bind(&g.grantor)
    .bind(g.amount_cents)
    .bind(g.start_date)
    .bind(g.end_date)
    .bind(g.status.as_str())
    .bind(g.fund_id)
    .bind(&g.notes)
    .bind(actor)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(grant) => Ok(grant),
        None => Err(records::version_failure(pool, TABLE, ENTITY, id).await),
    }
}

/// Version-checked soft delete. Linked live transactions and active
/// recurring templates block it.
pub async fn delete_grant(pool: &DbPool, actor: &str, id: Uuid, version: i32) -> Result<(), AppError> {
    let in_use: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE grant_id = $1 AND NOT is_deleted)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if in_use {
        return Err(AppError::InvalidOperation(
            "Cannot delete a grant that has transactions".to_string(),
        ));
    }

    let scheduled: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM recurring_transactions WHERE grant_id = $1 AND is_active)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if scheduled {
        return Err(AppError::InvalidOperation(
            "Cannot delete a grant used by active recurring transactions".to_string(),
        ));
    }

    let affected = sqlx::query(
        r#"
        UPDATE grants
        SET is_deleted = true, deleted_at = NOW(), deleted_by = $3,
            updated_at = NOW(), updated_by = $3, version = version + 1
        WHERE id = $1 AND version = $2 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .bind(version)
    .bind(actor)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(records::version_failure(pool, TABLE, ENTITY, id).await);
    }

    tracing::info!(grant_id = %id, actor, "grant soft-deleted");
    Ok(())
}

pub async fn restore_grant(pool: &DbPool, actor: &str, id: Uuid) -> Result<Grant, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_grant(pool, id, false).await
}

/// Spending against the grant from live linked transactions.
pub async fn grant_utilization(pool: &DbPool, id: Uuid) -> Result<GrantUtilization, AppError> {
    let grant = get_grant(pool, id, false).await?;

    let (spent, received): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount_cents) FILTER (WHERE transaction_type = 'expense'), 0)::BIGINT,
            COALESCE(SUM(amount_cents) FILTER (WHERE transaction_type = 'income'), 0)::BIGINT
        FROM transactions
        WHERE grant_id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(GrantUtilization::compute(
        grant.id,
        grant.amount_cents,
        spent,
        received,
    ))
}
