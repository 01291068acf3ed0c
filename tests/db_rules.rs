//! Business rules that need a live Postgres.
//!
//! Runs against `DATABASE_URL` and skips when it is unset. Every record gets
//! a unique name, so the suite can run repeatedly against the same database.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use nonprofit_manager::{
    db::{self, DbPool},
    error::AppError,
    middleware::auth::hash_api_key,
    models::{
        category::{Category, CategoryRequest},
        fund::{CreateFundRequest, Fund},
        grant::{Grant, GrantRequest},
        recurring::{RecurringRequest, RecurringTransaction},
        transaction::{
            CreateTransactionRequest, Transaction, TransactionFilter, UpdateTransactionRequest,
        },
    },
    routes,
    services::{
        category_service, fund_service, grant_service, recurring_service, transaction_service,
    },
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const ACTOR: &str = "db-tests";

async fn connect() -> anyhow::Result<Option<DbPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL missing; skipping database tests");
        return Ok(None);
    };
    let pool = db::create_pool(&url, 5).await?;
    db::run_migrations(&pool).await?;
    Ok(Some(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix} {}", Uuid::new_v4())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn fund(pool: &DbPool, fund_type: &str, opening_balance_cents: i64) -> anyhow::Result<Fund> {
    let request: CreateFundRequest = serde_json::from_value(json!({
        "name": unique("Fund"),
        "fund_type": fund_type,
        "opening_balance_cents": opening_balance_cents,
    }))?;
    Ok(fund_service::create_fund(pool, ACTOR, request).await?)
}

async fn category(pool: &DbPool, category_type: &str) -> anyhow::Result<Category> {
    let request: CategoryRequest = serde_json::from_value(json!({
        "name": unique("Category"),
        "category_type": category_type,
    }))?;
    Ok(category_service::create_category(pool, ACTOR, request).await?)
}

async fn grant(pool: &DbPool) -> anyhow::Result<Grant> {
    let request: GrantRequest = serde_json::from_value(json!({
        "name": unique("Grant"),
        "grantor": "County Arts Council",
        "amount_cents": 500_000,
        "start_date": "2025-01-01",
        "end_date": "2025-12-31",
    }))?;
    Ok(grant_service::create_grant(pool, ACTOR, request).await?)
}

async fn post(
    pool: &DbPool,
    fund: &Fund,
    category: &Category,
    kind: &str,
    amount_cents: i64,
) -> Result<Transaction, AppError> {
    let request: CreateTransactionRequest = serde_json::from_value(json!({
        "transaction_date": "2025-03-14",
        "amount_cents": amount_cents,
        "transaction_type": kind,
        "description": unique("Posting"),
        "category_id": category.id,
        "fund_id": fund.id,
    }))
    .map_err(|err| AppError::InvalidRequest(err.to_string()))?;
    transaction_service::create_transaction(pool, ACTOR, request).await
}

/// A template far enough in the future that no processing run picks it up.
async fn future_template(
    pool: &DbPool,
    fund: &Fund,
    category: &Category,
    kind: &str,
    grant_id: Option<Uuid>,
) -> anyhow::Result<RecurringTransaction> {
    let request: RecurringRequest = serde_json::from_value(json!({
        "description": unique("Scheduled"),
        "amount_cents": 1_500,
        "transaction_type": kind,
        "category_id": category.id,
        "fund_id": fund.id,
        "grant_id": grant_id,
        "frequency": "monthly",
        "start_date": "2099-01-01",
    }))?;
    Ok(recurring_service::create_recurring(pool, ACTOR, request).await?)
}

async fn fund_postings(pool: &DbPool, fund_id: Uuid, include_deleted: bool) -> anyhow::Result<i64> {
    let filter = TransactionFilter {
        fund_id: Some(fund_id),
        include_deleted,
        ..Default::default()
    };
    Ok(transaction_service::list_transactions(pool, &filter)
        .await?
        .total_count)
}

async fn authed_app(pool: &DbPool) -> anyhow::Result<(Router, String)> {
    let raw_key = format!("test-{}", Uuid::new_v4());
    sqlx::query("INSERT INTO api_keys (key_hash, user_name) VALUES ($1, $2)")
        .bind(hash_api_key(&raw_key))
        .bind(ACTOR)
        .execute(pool)
        .await?;
    Ok((routes::build_router(pool.clone()), format!("Bearer {raw_key}")))
}

async fn error_code(response: axum::response::Response) -> anyhow::Result<String> {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    Ok(body["error"]["code"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn category_with_transactions_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let donations = category(&pool, "income").await?;
    post(&pool, &general, &donations, "income", 2_500).await?;

    let err = category_service::delete_category(&pool, donations.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)), "{err:?}");

    let (app, auth) = authed_app(&pool).await?;
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/categories/{}", donations.id))
                .header("Authorization", auth)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await?, "invalid_operation");

    category_service::get_category(&pool, donations.id).await?;
    Ok(())
}

#[tokio::test]
async fn soft_deleted_transactions_are_hidden_from_lists() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let donations = category(&pool, "income").await?;
    post(&pool, &general, &donations, "income", 1_000).await?;
    let removed = post(&pool, &general, &donations, "income", 4_000).await?;

    transaction_service::delete_transaction(&pool, ACTOR, removed.id, removed.version).await?;

    assert_eq!(fund_postings(&pool, general.id, false).await?, 1);
    assert_eq!(fund_postings(&pool, general.id, true).await?, 2);
    assert_eq!(fund_service::get_fund(&pool, general.id, false).await?.balance_cents, 1_000);

    let hidden = transaction_service::get_transaction(&pool, removed.id, false).await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn stale_versions_are_rejected_with_conflict() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let donations = category(&pool, "income").await?;
    let gift = post(&pool, &general, &donations, "income", 3_000).await?;

    let first: UpdateTransactionRequest = serde_json::from_value(json!({
        "transaction_date": "2025-03-15",
        "amount_cents": 3_500,
        "transaction_type": "income",
        "description": "Corrected gift",
        "category_id": donations.id,
        "fund_id": general.id,
        "version": gift.version,
    }))?;
    let updated = transaction_service::update_transaction(&pool, ACTOR, gift.id, first).await?;
    assert_eq!(updated.version, gift.version + 1);

    let second: UpdateTransactionRequest = serde_json::from_value(json!({
        "transaction_date": "2025-03-16",
        "amount_cents": 9_000,
        "transaction_type": "income",
        "description": "Edited from an old copy",
        "category_id": donations.id,
        "fund_id": general.id,
        "version": gift.version,
    }))?;
    let err = transaction_service::update_transaction(&pool, ACTOR, gift.id, second)
        .await
        .unwrap_err();
    assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);
    assert_eq!(fund_service::get_fund(&pool, general.id, false).await?.balance_cents, 3_500);

    let (app, auth) = authed_app(&pool).await?;
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/v1/funds/{}", general.id))
                .header("Authorization", auth)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "name": unique("Renamed"),
                        "fund_type": "unrestricted",
                        "version": general.version + 7,
                    })
                    .to_string(),
                ))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(response).await?, "conflict");
    Ok(())
}

#[tokio::test]
async fn restricted_fund_cannot_be_overdrawn() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let scholarship = fund(&pool, "restricted", 1_000).await?;
    let awards = category(&pool, "expense").await?;

    let err = post(&pool, &scholarship, &awards, "expense", 5_000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance(_)), "{err:?}");
    assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(fund_service::get_fund(&pool, scholarship.id, false).await?.balance_cents, 1_000);
    assert_eq!(fund_postings(&pool, scholarship.id, true).await?, 0);

    // Spending exactly the balance is fine
    post(&pool, &scholarship, &awards, "expense", 1_000).await?;
    assert_eq!(fund_service::get_fund(&pool, scholarship.id, false).await?.balance_cents, 0);

    // Unrestricted funds may go negative
    let general = fund(&pool, "unrestricted", 0).await?;
    post(&pool, &general, &awards, "expense", 700).await?;
    assert_eq!(fund_service::get_fund(&pool, general.id, false).await?.balance_cents, -700);
    Ok(())
}

#[tokio::test]
async fn recurring_processing_posts_each_date_once() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let pledges = category(&pool, "income").await?;
    let request: RecurringRequest = serde_json::from_value(json!({
        "description": unique("Monthly pledge"),
        "amount_cents": 2_000,
        "transaction_type": "income",
        "category_id": pledges.id,
        "fund_id": general.id,
        "frequency": "monthly",
        "start_date": "2025-01-15",
    }))?;
    let template = recurring_service::create_recurring(&pool, ACTOR, request).await?;
    let today = date(2025, 4, 30);

    recurring_service::process_due(&pool, today).await?;
    assert_eq!(fund_postings(&pool, general.id, true).await?, 4);

    // A second run on the same day has nothing left to post
    recurring_service::process_due(&pool, today).await?;
    assert_eq!(fund_postings(&pool, general.id, true).await?, 4);

    // Rewinding the schedule replays dates that already have postings
    sqlx::query(
        "UPDATE recurring_transactions
         SET occurrences_generated = 0, next_occurrence = start_date
         WHERE id = $1",
    )
    .bind(template.id)
    .execute(&pool)
    .await?;
    recurring_service::process_due(&pool, today).await?;
    assert_eq!(fund_postings(&pool, general.id, true).await?, 4);
    assert_eq!(fund_service::get_fund(&pool, general.id, false).await?.balance_cents, 8_000);

    let refreshed = recurring_service::get_recurring(&pool, template.id).await?;
    assert_eq!(refreshed.next_occurrence, date(2025, 5, 15));
    Ok(())
}

#[tokio::test]
async fn category_type_is_locked_by_active_recurring_templates() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let rent = category(&pool, "expense").await?;
    let template = future_template(&pool, &general, &rent, "expense", None).await?;

    let retype: CategoryRequest = serde_json::from_value(json!({
        "name": rent.name,
        "category_type": "income",
    }))?;
    let err = category_service::update_category(&pool, ACTOR, rent.id, retype)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)), "{err:?}");

    // Once the template is gone the type may change
    recurring_service::delete_recurring(&pool, ACTOR, template.id).await?;
    let retype: CategoryRequest = serde_json::from_value(json!({
        "name": rent.name,
        "category_type": "income",
    }))?;
    let updated = category_service::update_category(&pool, ACTOR, rent.id, retype).await?;
    assert_eq!(updated.category_type.as_str(), "income");
    Ok(())
}

#[tokio::test]
async fn grant_with_active_recurring_template_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let grants_income = category(&pool, "income").await?;
    let arts = grant(&pool).await?;
    let template =
        future_template(&pool, &general, &grants_income, "income", Some(arts.id)).await?;

    let err = grant_service::delete_grant(&pool, ACTOR, arts.id, arts.version)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)), "{err:?}");
    grant_service::get_grant(&pool, arts.id, false).await?;

    recurring_service::delete_recurring(&pool, ACTOR, template.id).await?;
    grant_service::delete_grant(&pool, ACTOR, arts.id, arts.version).await?;
    let gone = grant_service::get_grant(&pool, arts.id, false).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn fund_delete_checks_version_and_usage() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let general = fund(&pool, "unrestricted", 0).await?;
    let donations = category(&pool, "income").await?;

    let err = fund_service::delete_fund(&pool, ACTOR, general.id, general.version + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    let gift = post(&pool, &general, &donations, "income", 1_200).await?;
    let err = fund_service::delete_fund(&pool, ACTOR, general.id, general.version)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)), "{err:?}");

    transaction_service::delete_transaction(&pool, ACTOR, gift.id, gift.version).await?;
    fund_service::delete_fund(&pool, ACTOR, general.id, general.version).await?;

    let err = fund_service::delete_fund(&pool, ACTOR, general.id, general.version + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
    Ok(())
}
