//! Fund service - CRUD and atomic balance adjustments.
//!
//! # Atomicity Guarantees
//!
//! A fund balance only changes through [`adjust_balance`], which runs on the
//! caller's database transaction with the fund row locked (`FOR UPDATE`).
//! The transaction row and the balance change commit or roll back together.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        fund::{
            CreateFundRequest, Fund, FundFilter, FundSummary, FundType, UpdateFundRequest,
            progress_percent,
        },
        pagination::{Paged, Pagination},
    },
    services::records,
};

const TABLE: &str = "funds";
const ENTITY: &str = "Fund";

pub async fn get_fund(pool: &DbPool, id: Uuid, include_deleted: bool) -> Result<Fund, AppError> {
    sqlx::query_as::<_, Fund>("SELECT * FROM funds WHERE id = $1 AND ($2 OR NOT is_deleted)")
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_funds(pool: &DbPool, filter: &FundFilter) -> Result<Paged<Fund>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let fund_type = filter.fund_type.map(|t| t.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM funds
        WHERE ($1::text IS NULL OR fund_type = $1)
          AND ($2 OR is_active)
          AND ($3 OR NOT is_deleted)
        "#,
    )
    .bind(fund_type)
    .bind(filter.include_inactive)
    .bind(filter.include_deleted)
    .fetch_one(pool)
    .await?;

    let funds = sqlx::query_as::<_, Fund>(
        r#"
        SELECT * FROM funds
        WHERE ($1::text IS NULL OR fund_type = $1)
          AND ($2 OR is_active)
          AND ($3 OR NOT is_deleted)
        ORDER BY LOWER(name)
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(fund_type)
    .bind(filter.include_inactive)
    .bind(filter.include_deleted)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(funds, pagination, total))
}

pub async fn create_fund(
    pool: &DbPool,
    actor: &str,
    request: CreateFundRequest,
) -> Result<Fund, AppError> {
    let request = request.validate()?;
    let fund = request.fund;

    let created = sqlx::query_as::<_, Fund>(
        r#"
        INSERT INTO funds (
            name, description, fund_type, balance_cents, target_cents, is_active,
            created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(&fund.name)
    .bind(&fund.description)
    .bind(fund.fund_type.as_str())
    .bind(request.opening_balance_cents)
    .bind(fund.target_cents)
    .bind(fund.is_active)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(fund_id = %created.id, name = %created.name, "fund created");
    Ok(created)
}

/// Version-checked replacement of the editable fields.
///
/// An unrestricted fund that is already overdrawn cannot be switched to
/// restricted.
pub async fn update_fund(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: UpdateFundRequest,
) -> Result<Fund, AppError> {
    let version = request.version;
    let fund = request.fund.validate()?;

    if fund.fund_type == FundType::Restricted {
        let current = get_fund(pool, id, false).await?;
        if current.fund_type != FundType::Restricted && current.balance_cents < 0 {
            return Err(AppError::InvalidOperation(
                "An overdrawn fund cannot be made restricted".to_string(),
            ));
        }
    }

    let updated = sqlx::query_as::<_, Fund>(
        r#"
        UPDATE funds
        SET name = $3,
            description = $4,
            fund_type = $5,
            target_cents = $6,
            is_active = $7,
            updated_by = $8,
            updated_at = NOW(),
            version = version + 1
        WHERE id = $1 AND version = $2 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(version)
    .bind(&fund.name)
    .bind(&fund.description)
    .bind(fund.fund_type.as_str())
    .bind(fund.target_cents)
    .bind(fund.is_active)
    .bind(actor)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(fund) => Ok(fund),
        None => Err(records::version_failure(pool, TABLE, ENTITY, id).await),
    }
}

/// Version-checked soft delete. Refused while live transactions or active
/// recurring templates still point at the fund.
///
/// The fund row stays locked from the usage check to the update, so a
/// posting that arrives meanwhile waits and then finds the fund gone.
pub async fn delete_fund(pool: &DbPool, actor: &str, id: Uuid, version: i32) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let current: i32 =
        sqlx::query_scalar("SELECT version FROM funds WHERE id = $1 AND NOT is_deleted FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound(ENTITY))?;
    if current != version {
        return Err(AppError::stale(ENTITY));
    }

    let in_use: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM transactions WHERE fund_id = $1 AND NOT is_deleted)
            OR EXISTS(SELECT 1 FROM recurring_transactions WHERE fund_id = $1 AND is_active)
        "#,
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if in_use {
        return Err(AppError::InvalidOperation(
            "Cannot delete a fund that still has transactions or active recurring transactions"
                .to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE funds
        SET is_deleted = true, deleted_at = NOW(), deleted_by = $2,
            updated_at = NOW(), updated_by = $2, version = version + 1
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(actor)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(fund_id = %id, actor, "fund soft-deleted");
    Ok(())
}

pub async fn restore_fund(pool: &DbPool, actor: &str, id: Uuid) -> Result<Fund, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_fund(pool, id, false).await
}

/// Income/expense totals over live transactions.
pub async fn fund_summary(pool: &DbPool, id: Uuid) -> Result<FundSummary, AppError> {
    let fund = get_fund(pool, id, false).await?;

    let (income, expense, count): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount_cents) FILTER (WHERE transaction_type = 'income'), 0)::BIGINT,
            COALESCE(SUM(amount_cents) FILTER (WHERE transaction_type = 'expense'), 0)::BIGINT,
            COUNT(*)
        FROM transactions
        WHERE fund_id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(FundSummary {
        fund_id: fund.id,
        name: fund.name,
        fund_type: fund.fund_type,
        balance_cents: fund.balance_cents,
        total_income_cents: income,
        total_expense_cents: expense,
        transaction_count: count,
        target_progress_percent: progress_percent(fund.balance_cents, fund.target_cents),
    })
}

/// Move a fund balance by `delta_cents` inside the caller's transaction.
///
/// # Errors
///
/// - `NotFound`: fund missing or soft-deleted
/// - `InsufficientBalance`: a restricted fund would drop below zero
pub async fn adjust_balance(
    conn: &mut PgConnection,
    fund_id: Uuid,
    delta_cents: i64,
) -> Result<i64, AppError> {
    if delta_cents == 0 {
        let balance: i64 = sqlx::query_scalar(
            "SELECT balance_cents FROM funds WHERE id = $1 AND NOT is_deleted",
        )
        .bind(fund_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound(ENTITY))?;
        return Ok(balance);
    }

    // Lock the fund row so concurrent postings serialise
    let (balance, fund_type): (i64, String) = sqlx::query_as(
        "SELECT balance_cents, fund_type FROM funds WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(fund_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    let new_balance = balance
        .checked_add(delta_cents)
        .ok_or_else(|| AppError::InvalidRequest("Amount out of range".to_string()))?;

    if fund_type.parse::<FundType>()? == FundType::Restricted && new_balance < 0 {
        return Err(AppError::InsufficientBalance(format!(
            "Restricted fund balance is {balance} cents; this change needs {} cents",
            -delta_cents
        )));
    }

    sqlx::query("UPDATE funds SET balance_cents = $1, updated_at = NOW() WHERE id = $2")
        .bind(new_balance)
        .bind(fund_id)
        .execute(&mut *conn)
        .await?;

    Ok(new_balance)
}
