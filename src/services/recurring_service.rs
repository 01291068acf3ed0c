//! Recurring transaction templates and their processing.
//!
//! Each template is processed in its own database transaction. A template
//! that fails (e.g. its restricted fund is empty) is logged and left
//! unchanged so the next run tries again; other templates still post.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::recurring::{
        ProcessSummary, RecurringFilter, RecurringRequest, RecurringTransaction,
    },
    services::transaction_service,
};

const ENTITY: &str = "Recurring transaction";

/// Audit name recorded on generated postings.
pub const SYSTEM_ACTOR: &str = "system:recurring";

pub async fn get_recurring(pool: &DbPool, id: Uuid) -> Result<RecurringTransaction, AppError> {
    sqlx::query_as::<_, RecurringTransaction>("SELECT * FROM recurring_transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

pub async fn list_recurring(
    pool: &DbPool,
    filter: &RecurringFilter,
) -> Result<Vec<RecurringTransaction>, AppError> {
    let templates = sqlx::query_as::<_, RecurringTransaction>(
        r#"
        SELECT * FROM recurring_transactions
        WHERE ($1 OR is_active)
          AND ($2::uuid IS NULL OR fund_id = $2)
        ORDER BY next_occurrence, description
        "#,
    )
    .bind(filter.include_inactive)
    .bind(filter.fund_id)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}

/// Category must match the type; fund, donor and grant must be live.
async fn check_references(pool: &DbPool, request: &RecurringRequest) -> Result<(), AppError> {
    let category_type: Option<String> =
        sqlx::query_scalar("SELECT category_type FROM categories WHERE id = $1")
            .bind(request.category_id)
            .fetch_optional(pool)
            .await?;
    match category_type {
        None => {
            return Err(AppError::InvalidRequest(
                "Referenced category does not exist".to_string(),
            ));
        }
        Some(t) if t != request.transaction_type.as_str() => {
            return Err(AppError::InvalidRequest(format!(
                "Category is for {t} but the template is {}",
                request.transaction_type
            )));
        }
        Some(_) => {}
    }

    let refs: [(&'static str, Option<Uuid>, &str); 3] = [
        ("funds", Some(request.fund_id), "fund"),
        ("donors", request.donor_id, "donor"),
        ("grants", request.grant_id, "grant"),
    ];
    for (table, id, name) in refs {
        if let Some(id) = id {
            if !crate::services::records::exists_live(pool, table, id).await? {
                return Err(AppError::InvalidRequest(format!(
                    "Referenced {name} does not exist"
                )));
            }
        }
    }

    Ok(())
}

pub async fn create_recurring(
    pool: &DbPool,
    actor: &str,
    request: RecurringRequest,
) -> Result<RecurringTransaction, AppError> {
    let r = request.validate()?;
    check_references(pool, &r).await?;

    let template = sqlx::query_as::<_, RecurringTransaction>(
        r#"
        INSERT INTO recurring_transactions (
            description, amount_cents, transaction_type, payee, category_id, fund_id,
            donor_id, grant_id, frequency, start_date, end_date, next_occurrence,
            is_active, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $10, $12, $13, $13)
        RETURNING *
        "#,
    )
    .bind(&r.description)
    .bind(r.amount_cents)
    .bind(r.transaction_type.as_str())
    .bind(&r.payee)
    .bind(r.category_id)
    .bind(r.fund_id)
    .bind(r.donor_id)
    .bind(r.grant_id)
    .bind(r.frequency.as_str())
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.is_active)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        recurring_id = %template.id,
        frequency = %template.frequency,
        start_date = %template.start_date,
        "recurring transaction created"
    );
    Ok(template)
}

/// Replace a template.
///
/// Changing the frequency or start date restarts the schedule from the new
/// start date. Postings already made are not duplicated because each
/// occurrence date has its own idempotency key.
pub async fn update_recurring(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: RecurringRequest,
) -> Result<RecurringTransaction, AppError> {
    let r = request.validate()?;
    let existing = get_recurring(pool, id).await?;
    check_references(pool, &r).await?;

    let schedule_changed =
        existing.frequency != r.frequency || existing.start_date != r.start_date;
    let (generated, next) = if schedule_changed {
        (0, r.start_date)
    } else {
        (existing.occurrences_generated, existing.next_occurrence)
    };
    let is_active = r.is_active && r.end_date.is_none_or(|end| next <= end);

    let template = sqlx::query_as::<_, RecurringTransaction>(
        r#"
        UPDATE recurring_transactions
        SET description = $2, amount_cents = $3, transaction_type = $4, payee = $5,
            category_id = $6, fund_id = $7, donor_id = $8, grant_id = $9,
            frequency = $10, start_date = $11, end_date = $12,
            occurrences_generated = $13, next_occurrence = $14, is_active = $15,
            updated_by = $16, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&r.description)
    .bind(r.amount_cents)
    .bind(r.transaction_type.as_str())
    .bind(&r.payee)
    .bind(r.category_id)
    .bind(r.fund_id)
    .bind(r.donor_id)
    .bind(r.grant_id)
    .bind(r.frequency.as_str())
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(generated)
    .bind(next)
    .bind(is_active)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))?;

    Ok(template)
}

/// Delete a template. Templates that already produced postings are only
/// deactivated so the postings keep their link.
pub async fn delete_recurring(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    get_recurring(pool, id).await?;

    let has_postings: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE recurring_transaction_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    if has_postings {
        sqlx::query(
            "UPDATE recurring_transactions
             SET is_active = false, updated_by = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await?;
        tracing::info!(recurring_id = %id, actor, "recurring transaction deactivated");
    } else {
        sqlx::query("DELETE FROM recurring_transactions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        tracing::info!(recurring_id = %id, actor, "recurring transaction deleted");
    }

    Ok(())
}

/// Post every due occurrence of one template and advance its schedule.
///
/// Returns the number of transactions created.
async fn process_template(pool: &DbPool, id: Uuid, today: NaiveDate) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;

    let Some(template) = sqlx::query_as::<_, RecurringTransaction>(
        "SELECT * FROM recurring_transactions WHERE id = $1 AND is_active FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        // Deactivated since the due list was read
        return Ok(0);
    };

    let plan = template.plan(today);
    let mut created = 0;

    for date in &plan.due {
        let key = template.idempotency_key(*date);
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE idempotency_key = $1)",
        )
        .bind(&key)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            continue;
        }

        transaction_service::insert_posting(
            &mut *tx,
            SYSTEM_ACTOR,
            &template.posting_for(*date),
            Some(&key),
            Some(template.id),
        )
        .await?;
        created += 1;
    }

    sqlx::query(
        r#"
        UPDATE recurring_transactions
        SET occurrences_generated = $2,
            next_occurrence = COALESCE($3, next_occurrence),
            is_active = $4,
            last_processed_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(plan.occurrences_generated)
    .bind(plan.next_occurrence)
    .bind(plan.still_active)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if !plan.still_active {
        tracing::info!(recurring_id = %id, "recurring transaction reached its end date");
    }
    Ok(created)
}

/// Process every active template due on or before `today`.
///
/// # Errors
///
/// Fails only when the due list cannot be read; per-template failures are
/// logged and counted in the summary.
pub async fn process_due(pool: &DbPool, today: NaiveDate) -> Result<ProcessSummary, AppError> {
    let due: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM recurring_transactions
        WHERE is_active AND next_occurrence <= $1
        ORDER BY next_occurrence
        "#,
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    let mut summary = ProcessSummary::default();

    for id in due {
        match process_template(pool, id, today).await {
            Ok(created) => {
                summary.templates_processed += 1;
                summary.transactions_created += created;
            }
            Err(err) => {
                summary.templates_failed += 1;
                tracing::error!(recurring_id = %id, error = %err, "failed to process recurring transaction");
            }
        }
    }

    tracing::info!(
        processed = summary.templates_processed,
        created = summary.transactions_created,
        failed = summary.templates_failed,
        %today,
        "recurring transactions processed"
    );
    Ok(summary)
}
