//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions - Record income or expense
//! - GET /api/v1/transactions - Filtered, paged ledger
//! - GET /api/v1/transactions/{id} - Get transaction details
//! - PUT /api/v1/transactions/{id} - Edit (version checked)
//! - DELETE /api/v1/transactions/{id}?version=N - Soft delete and reverse
//! - POST /api/v1/transactions/{id}/restore - Restore and re-apply

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        DeletedParam, VersionParam,
        pagination::Paged,
        transaction::{
            CreateTransactionRequest, Transaction, TransactionFilter, UpdateTransactionRequest,
        },
    },
    services::transaction_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Record a transaction and apply it to its fund.
///
/// # Request Body
///
/// ```json
/// {
///   "transaction_date": "2025-03-14",
///   "amount_cents": 25000,
///   "transaction_type": "income",
///   "description": "Spring appeal gift",
///   "category_id": "550e8400-...",
///   "fund_id": "660e8400-...",
///   "donor_id": "770e8400-...",
///   "idempotency_key": "gift-2025-03-14-001"
/// }
/// ```
///
/// # Response (201)
///
/// The stored transaction. Repeating the request with the same
/// `idempotency_key` returns the original transaction without posting
/// again.
///
/// # Errors
///
/// - 400 for invalid amounts, a category of the wrong type or missing references
/// - 422 if an expense would overdraw a restricted fund
pub async fn create_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction =
        transaction_service::create_transaction(&pool, &auth.user_name, request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List transactions.
///
/// Query parameters: `from_date`, `to_date`, `transaction_type`,
/// `category_id`, `fund_id`, `donor_id`, `grant_id`, `search`,
/// `include_deleted`, `page`, `page_size`.
pub async fn list_transactions(
    State(pool): State<DbPool>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Paged<Transaction>>, AppError> {
    Ok(Json(
        transaction_service::list_transactions(&pool, &filter).await?,
    ))
}

pub async fn get_transaction(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeletedParam>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(
        transaction_service::get_transaction(&pool, id, params.include_deleted).await?,
    ))
}

/// Edit a transaction. Fund balances move by the difference.
pub async fn update_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(
        transaction_service::update_transaction(&pool, &auth.user_name, id, request).await?,
    ))
}

pub async fn delete_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(params): Query<VersionParam>,
) -> Result<StatusCode, AppError> {
    transaction_service::delete_transaction(&pool, &auth.user_name, id, params.version).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(
        transaction_service::restore_transaction(&pool, &auth.user_name, id).await?,
    ))
}
