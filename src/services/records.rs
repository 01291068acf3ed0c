//! Soft-delete, restore and concurrency helpers shared by every entity table.
//!
//! All soft-deletable tables carry `is_deleted`, `deleted_at`, `deleted_by`,
//! `updated_at` and `updated_by` columns. Table names passed here are always
//! compile-time constants.

use uuid::Uuid;

use crate::{db::DbPool, error::AppError};

/// Whether a live (not soft-deleted) row exists.
pub async fn exists_live(pool: &DbPool, table: &'static str, id: Uuid) -> Result<bool, AppError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND NOT is_deleted)");
    Ok(sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?)
}

/// Explain why a version-checked statement touched no rows.
///
/// Returns 409 when the row is still there (someone else bumped the
/// version), 404 when it is gone or soft-deleted.
pub async fn version_failure(
    pool: &DbPool,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
) -> AppError {
    match exists_live(pool, table, id).await {
        Ok(true) => AppError::stale(entity),
        Ok(false) => AppError::NotFound(entity),
        Err(err) => err,
    }
}

/// Mark a row deleted without a version check.
pub async fn soft_delete(
    pool: &DbPool,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
    actor: &str,
) -> Result<(), AppError> {
    let sql = format!(
        "UPDATE {table}
         SET is_deleted = true, deleted_at = NOW(), deleted_by = $2,
             updated_at = NOW(), updated_by = $2
         WHERE id = $1 AND NOT is_deleted"
    );
    let affected = sqlx::query(&sql)
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(entity));
    }

    tracing::info!(table, id = %id, actor, "record soft-deleted");
    Ok(())
}

/// Clear the deleted flag on a soft-deleted row.
pub async fn restore(
    pool: &DbPool,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
    actor: &str,
) -> Result<(), AppError> {
    let sql = format!(
        "UPDATE {table}
         SET is_deleted = false, deleted_at = NULL, deleted_by = NULL,
             updated_at = NOW(), updated_by = $2
         WHERE id = $1 AND is_deleted"
    );
    let affected = sqlx::query(&sql)
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(if exists_live(pool, table, id).await? {
            AppError::InvalidOperation(format!("{entity} is not deleted"))
        } else {
            AppError::NotFound(entity)
        });
    }

    tracing::info!(table, id = %id, actor, "record restored");
    Ok(())
}

/// `%term%` pattern for ILIKE searches, with LIKE wildcards escaped.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some(" roof ")), Some("%roof%".to_string()));
        assert_eq!(like_pattern(Some("50%_off")), Some("%50\\%\\_off%".to_string()));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
