//! Donor service.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        donor::{Donor, DonorFilter, DonorRequest, GivingSummary},
        pagination::{Paged, Pagination},
    },
    services::records,
};

const TABLE: &str = "donors";
const ENTITY: &str = "Donor";

pub async fn get_donor(pool: &DbPool, id: Uuid, include_deleted: bool) -> Result<Donor, AppError> {
    sqlx::query_as::<_, Donor>("SELECT * FROM donors WHERE id = $1 AND ($2 OR NOT is_deleted)")
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(ENTITY))
}

/// Paged donors, ordered by last name / organization name.
pub async fn list_donors(pool: &DbPool, filter: &DonorFilter) -> Result<Paged<Donor>, AppError> {
    let pagination = Pagination::new(filter.page, filter.page_size);
    let pattern = records::like_pattern(filter.search.as_deref());
    let donor_type = filter.donor_type.map(|t| t.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM donors
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR donor_type = $2)
          AND ($3::text IS NULL
               OR first_name ILIKE $3 OR last_name ILIKE $3
               OR organization_name ILIKE $3 OR email ILIKE $3)
        "#,
    )
    .bind(filter.include_deleted)
    .bind(donor_type)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let donors = sqlx::query_as::<_, Donor>(
        r#"
        SELECT * FROM donors
        WHERE ($1 OR NOT is_deleted)
          AND ($2::text IS NULL OR donor_type = $2)
          AND ($3::text IS NULL
               OR first_name ILIKE $3 OR last_name ILIKE $3
               OR organization_name ILIKE $3 OR email ILIKE $3)
        ORDER BY LOWER(COALESCE(organization_name, last_name)), LOWER(first_name), created_at
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.include_deleted)
    .bind(donor_type)
    .bind(&pattern)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paged::new(donors, pagination, total))
}

pub async fn create_donor(
    pool: &DbPool,
    actor: &str,
    request: DonorRequest,
) -> Result<Donor, AppError> {
    let d = request.validate()?;

    let donor = sqlx::query_as::<_, Donor>(
        r#"
        INSERT INTO donors (
            donor_type, first_name, last_name, organization_name, email, phone,
            address_line, city, state, postal_code, notes, created_by, updated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        RETURNING *
        "#,
    )
    .bind(d.donor_type.as_str())
    .bind(&d.first_name)
    .bind(&d.last_name)
    .bind(&d.organization_name)
    .bind(&d.email)
    .bind(&d.phone)
    .bind(&d.address_line)
    .bind(&d.city)
    .bind(&d.state)
    .bind(&d.postal_code)
    .bind(&d.notes)
    .bind(actor)
    .fetch_one(pool)
    .await?;

    tracing::info!(donor_id = %donor.id, "donor created");
    Ok(donor)
}

pub async fn update_donor(
    pool: &DbPool,
    actor: &str,
    id: Uuid,
    request: DonorRequest,
) -> Result<Donor, AppError> {
    let d = request.validate()?;

    sqlx::query_as::<_, Donor>(
        r#"
        UPDATE donors
        SET donor_type = $2, first_name = $3, last_name = $4, organization_name = $5,
            email = $6, phone = $7, address_line = $8, city = $9, state = $10,
            postal_code = $11, notes = $12, updated_by = $13, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(d.donor_type.as_str())
    .bind(&d.first_name)
    .bind(&d.last_name)
    .bind(&d.organization_name)
    .bind(&d.email)
    .bind(&d.phone)
    .bind(&d.address_line)
    .bind(&d.city)
    .bind(&d.state)
    .bind(&d.postal_code)
    .bind(&d.notes)
    .bind(actor)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(ENTITY))
}

/// Soft delete. Gifts keep pointing at the donor, so history survives.
pub async fn delete_donor(pool: &DbPool, actor: &str, id: Uuid) -> Result<(), AppError> {
    let has_active_schedule: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM recurring_transactions WHERE donor_id = $1 AND is_active)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if has_active_schedule {
        return Err(AppError::InvalidOperation(
            "Cannot delete a donor with active recurring gifts".to_string(),
        ));
    }

    records::soft_delete(pool, TABLE, ENTITY, id, actor).await
}

pub async fn restore_donor(pool: &DbPool, actor: &str, id: Uuid) -> Result<Donor, AppError> {
    records::restore(pool, TABLE, ENTITY, id, actor).await?;
    get_donor(pool, id, false).await
}

/// Lifetime giving, counting live income transactions only.
pub async fn giving_summary(pool: &DbPool, id: Uuid) -> Result<GivingSummary, AppError> {
    let donor = get_donor(pool, id, true).await?;

    let row: (i64, i64, Option<chrono::NaiveDate>, Option<chrono::NaiveDate>, Option<i64>) =
        sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT,
                   COUNT(*),
                   MIN(transaction_date),
                   MAX(transaction_date),
                   MAX(amount_cents)
            FROM transactions
            WHERE donor_id = $1 AND transaction_type = 'income' AND NOT is_deleted
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(GivingSummary {
        donor_id: donor.id,
        display_name: donor.display_name(),
        total_given_cents: row.0,
        gift_count: row.1,
        first_gift_date: row.2,
        last_gift_date: row.3,
        largest_gift_cents: row.4,
    })
}
