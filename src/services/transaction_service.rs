//! Transaction service - Core business logic for income and expense postings.
//!
//! This service handles:
//! - Atomic fund balance updates
//! - Idempotency checking
//! - Reference validation (category type, live fund/donor/grant)
//! - Optimistic concurrency on update and delete
//! - Soft delete and restore, reversing and re-applying the fund effect
//!
//! # Atomicity Guarantees
//!
//! Every write runs in one PostgreSQL transaction: the transaction row and
//! the fund balance(s) it touches commit together or not at all.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        category::TransactionType,
        pagination::{Paged, Pagination},
        transaction::{
            CreateTransactionRequest, Transaction, TransactionFilter, TransactionRequest,
            UpdateTransactionRequest,
        },
    },
    services::{fund_service, records},
};

const ENTITY: &str = "Transaction";

/// Get transaction by ID. Soft-deleted rows only when asked for.
pub async fn get_transaction(
    pool: &DbPool,
    id: Uuid,
    include_deleted: bool,
) -> Result<Transaction, AppError> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 AND ($2 OR NOT is_deleted)",
    )
    .bind(id)
    .bind(include_deleted)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

const LIST_FILTER: &str = r#"
    WHERE ($1 OR NOT is_deleted)
      AND ($2::date IS NULL OR transaction_date >= $2)
      AND ($3::date IS NULL OR transaction_date <= $3)
      AND ($4::text IS NULL OR transaction_type = $4)
      AND ($5::uuid IS NULL OR category_id = $5)
      AND ($6::uuid IS NULL OR fund_id = $6)
      AND ($7::uuid IS NULL OR donor_id = $7)
      AND ($8::uuid IS NULL OR grant_id = $8)
      AND ($9::text IS NULL
           OR description ILIKE $9 OR payee ILIKE $9 OR reference_number ILIKE $9)
"#;

/// Paged transactions, newest first.
pub async fn list_transactions(
    pool: &DbPool,
    filter: &TransactionFilter,
) -> Result<Paged<Transaction>, AppError> {
    filter.validate()?;
    let pagination = Pagination::new(filter.page, filter.page_size);
    let pattern = records::like_pattern(filter.search.as_deref());
    let transaction_type = filter.transaction_type.map(|t| t.as_str());

    let count_sql = format!("SELECT COUNT(*) FROM transactions {LIST_FILTER}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(filter.include_deleted)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(transaction_type)
        .bind(filter.category_id)
        .bind(filter.fund_id)
        .bind(filter.donor_id)
        .bind(filter.grant_id)
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    let page_sql = format!(
        "SELECT * FROM transactions {LIST_FILTER}
         ORDER BY transaction_date DESC, created_at DESC
         LIMIT $10 OFFSET $11"
    );
    let transactions = sqlx::query_as::<_, Transaction>(&page_sql)
        .bind(filter.include_deleted)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(transaction_type)
        .bind(filter.category_id)
        .bind(filter.fund_id)
        .bind(filter.donor_id)
        .bind(filter.grant_id)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

    Ok(Paged::new(transactions, pagination, total))
}

/// Check that every referenced record exists, is live, and fits.
///
/// Fund existence is checked later while locking it for the balance change.
async fn check_references(
    conn: &mut PgConnection,
    request: &TransactionRequest,
) -> Result<(), AppError> {
    let category_type: Option<String> =
        sqlx::query_scalar("SELECT category_type FROM categories WHERE id = $1")
            .bind(request.category_id)
            .fetch_optional(&mut *conn)
            .await?;
    let category_type: TransactionType = category_type
        .ok_or_else(|| AppError::InvalidRequest("Referenced category does not exist".to_string()))?
        .parse()?;
    if category_type != request.transaction_type {
        return Err(AppError::InvalidRequest(format!(
            "Category is for {category_type} but the transaction is {}",
            request.transaction_type
        )));
    }

    if let Some(donor_id) = request.donor_id {
        let live: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM donors WHERE id = $1 AND NOT is_deleted)",
        )
        .bind(donor_id)
        .fetch_one(&mut *conn)
        .await?;
        if !live {
            return Err(AppError::InvalidRequest(
                "Referenced donor does not exist".to_string(),
            ));
        }
    }

    if let Some(grant_id) = request.grant_id {
        let live: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM grants WHERE id = $1 AND NOT is_deleted)",
        )
        .bind(grant_id)
        .fetch_one(&mut *conn)
        .await?;
        if !live {
            return Err(AppError::InvalidRequest(
                "Referenced grant does not exist".to_string(),
            ));
        }
    }

    Ok(())
}

/// Insert a validated posting and move its fund, on the caller's transaction.
///
/// Shared by the API and the recurring-transaction processor.
pub(crate) async fn insert_posting(
    conn: &mut PgConnection,
    actor: &str,
    request: &TransactionRequest,
    idempotency_key: Option<&str>,
    recurring_transaction_id: Option<Uuid>,
) -> Result<Transaction, AppError> {
    check_references(&mut *conn, request).await?;

    fund_service::adjust_balance(&mut *conn, request.fund_id, request.fund_effect()).await?;

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            transaction_date, amount_cents, transaction_type, description, payee,
            reference_number, category_id, fund_id, donor_id, grant_id,
            recurring_transaction_id, idempotency_key, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
        RETURNING *
        "#,
    )
    .bind(request.transaction_date)
    .bind(request.amount_cents)
    .bind(request.transaction_type.as_str())
    .bind(&request.description)
    .bind(&request.payee)
    .bind(&request.reference_number)
    .bind(request.category_id)
    .bind(request.fund_id)
    .bind(request.donor_id)
    .bind(request.grant_id)
    .bind(recurring_transaction_id)
    .bind(idempotency_key)
    .bind(actor)
    .fetch_one(&mut *conn)
    .await?;

    Ok(transaction)
}

async fn find_by_idempotency_key(
    pool: &DbPool,
    key: &str,
) -> Result<Option<Transaction>, AppError> {
    Ok(
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?,
    )
}

fn is_unique_violation(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

/// Record a transaction.
///
/// # Process
///
/// 1. Check for duplicate idempotency key
/// 2. Start database transaction
/// 3. Validate references, lock the fund, apply the balance change
/// 4. Record transaction
/// 5. Commit (or rollback on error)
///
/// # Errors
///
/// - `InvalidRequest`: bad amount, missing or mismatched references
/// - `NotFound`: fund missing or deleted
/// - `InsufficientBalance`: expense would overdraw a restricted fund
pub async fn create_transaction(
    pool: &DbPool,
    actor: &str,
    request: CreateTransactionRequest,
) -> Result<Transaction, AppError> {
    let transaction = request.transaction.validate()?;
    let idempotency_key = request
        .idempotency_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    if let Some(ref key) = idempotency_key {
        if let Some(existing) = find_by_idempotency_key(pool, key).await? {
            tracing::debug!(idempotency_key = %key, "returning existing transaction");
            return Ok(existing);
        }
    }

    let mut tx = pool.begin().await?;
    let created = insert_posting(&mut *tx, actor, &transaction, idempotency_key.as_deref(), None).await;

    match created {
        Ok(created) => {
            tx.commit().await?;
            tracing::info!(
                transaction_id = %created.id,
                fund_id = %created.fund_id,
                amount_cents = created.amount_cents,
                transaction_type = %created.transaction_type,
                "transaction recorded"
            );
            Ok(created)
        }
        // Lost a race on the same idempotency key
        Err(err) if idempotency_key.is_some() && is_unique_violation(&err) => {
            tx.rollback().await?;
            let key = idempotency_key.as_deref().unwrap_or_default();
            find_by_idempotency_key(pool, key).await?.ok_or(err)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err)
        }
    }
}

/// Lock a live transaction row and check its version.
async fn lock_for_change(
    conn: &mut PgConnection,
    id: Uuid,
    version: i32,
) -> Result<Transaction, AppError> {
    let current = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    if current.version != version {
        return Err(AppError::stale(ENTITY));
    }

    Ok(current)
}

/// Replace a transaction, moving money between funds as needed.
///
/// The old effect is reversed on the old fund and the new effect applied to
/// the new fund in the same database transaction.
pub async fn update_transaction(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: UpdateTransactionRequest,
) -> Result<Transaction, AppError> {
    let version = request.version;
    let next = request.transaction.validate()?;

    let mut tx = pool.begin().await?;
    let current = lock_for_change(&mut *tx, id, version).await?;

    check_references(&mut *tx, &next).await?;

    // Same fund: only the net difference moves.
    if current.fund_id == next.fund_id {
        fund_service::adjust_balance(
            &mut *tx,
            current.fund_id,
            next.fund_effect() - current.fund_effect(),
        )
        .await?;
    } else {
        fund_service::adjust_balance(&mut *tx, current.fund_id, -current.fund_effect()).await?;
        fund_service::adjust_balance(&mut *tx, next.fund_id, next.fund_effect()).await?;
    }

    let updated = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET transaction_date = $2, amount_cents = $3, transaction_type = $4,
            description = $5, payee = $6, reference_number = $7, category_id = $8,
            fund_id = $9, donor_id = $10, grant_id = $11, updated_by = $12,
            updated_at = NOW(), version = version + 1
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(next.transaction_date)
    .bind(next.amount_cents)
    .bind(next.transaction_type.as_str())
    .bind(&next.description)
    .bind(&next.payee)
    .bind(&next.reference_number)
    .bind(next.category_id)
    .bind(next.fund_id)
    .bind(next.donor_id)
    .bind(next.grant_id)
    .bind(actor)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(transaction_id = %id, version = updated.version, "transaction updated");
    Ok(updated)
}

/// Version-checked soft delete. The fund effect is reversed.
pub async fn delete_transaction(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    version: i32,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let current = lock_for_change(&mut *tx, id, version).await?;

    fund_service::adjust_balance(&mut *tx, current.fund_id, -current.fund_effect()).await?;

    sqlx::query(
        r#"
        UPDATE transactions
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

    tracing::info!(transaction_id = %id, actor, "transaction soft-deleted");
    Ok(())
}

/// Undo a soft delete and re-apply the fund effect.
pub async fn restore_transaction(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
) -> Result<Transaction, AppError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    if !current.is_deleted {
        return Err(AppError::InvalidOperation(
            "Transaction is not deleted".to_string(),
        ));
    }

    let request = TransactionRequest {
        transaction_date: current.transaction_date,
        amount_cents: current.amount_cents,
        transaction_type: current.transaction_type,
        description: current.description.clone(),
        payee: current.payee.clone(),
        reference_number: current.reference_number.clone(),
        category_id: current.category_id,
        fund_id: current.fund_id,
        donor_id: current.donor_id,
        grant_id: current.grant_id,
    };
    check_references(&mut *tx, &request).await?;
    fund_service::adjust_balance(&mut *tx, current.fund_id, current.fund_effect()).await?;

    let restored = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET is_deleted = false, deleted_at = NULL, deleted_by = NULL,
            updated_at = NOW(), updated_by = $2, version = version + 1
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(actor)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(transaction_id = %id, actor, "transaction restored");
    Ok(restored)
}
