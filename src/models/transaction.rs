//! Transaction data models and API request types.
//!
//! This module defines:
//! - `Transaction`: Database entity for one income or expense posting
//! - Request types for create and version-checked update
//! - `TransactionFilter`: list query parameters

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::error::AppError;

pub use super::category::TransactionType;

/// Signed effect of a posting on its fund: income adds, expense subtracts.
pub fn signed_amount(transaction_type: TransactionType, amount_cents: i64) -> i64 {
    match transaction_type {
        TransactionType::Income => amount_cents,
        TransactionType::Expense => -amount_cents,
    }
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Belongs to exactly one category and one fund
/// - Optionally names a donor (income only) and a grant
/// - Stores amount in cents (never floats!) and always positive;
///   direction comes from `transaction_type`
/// - Carries a `version` concurrency token and soft-delete columns
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_date: NaiveDate,
    pub amount_cents: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub description: String,
    pub payee: Option<String>,
    /// Check number, invoice number, etc.
    pub reference_number: Option<String>,
    pub category_id: Uuid,
    pub fund_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub grant_id: Option<Uuid>,
    /// Template that generated this row, for recurring postings
    pub recurring_transaction_id: Option<Uuid>,
    /// If a client sends the same key twice, the second request returns
    /// the original transaction instead of creating a duplicate.
    pub idempotency_key: Option<String>,
    pub version: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Transaction {
    /// Signed effect this row has on its fund balance.
    pub fn fund_effect(&self) -> i64 {
        signed_amount(self.transaction_type, self.amount_cents)
    }
}

/// Editable transaction fields.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_date": "2025-03-14",
///   "amount_cents": 25000,
///   "transaction_type": "income",
///   "description": "Spring appeal gift",
///   "category_id": "550e8400-e29b-41d4-a716-446655440000",
///   "fund_id": "660e8400-e29b-41d4-a716-446655440001",
///   "donor_id": "770e8400-e29b-41d4-a716-446655440002"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    pub transaction_date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub category_id: Uuid,
    pub fund_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub grant_id: Option<Uuid>,
}

impl TransactionRequest {
    /// # Validation
    ///
    /// - `amount_cents` must be positive
    /// - `description` is required (≤ 500 chars)
    /// - donors can only be attached to income
    pub fn validate(mut self) -> Result<Self, AppError> {
        if self.amount_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        require_text("description", &self.description, 500)?;
        if self.donor_id.is_some() && self.transaction_type != TransactionType::Income {
            return Err(AppError::InvalidRequest(
                "Only income transactions can have a donor".to_string(),
            ));
        }
        self.description = self.description.trim().to_string();
        self.payee = clean_optional(self.payee);
        self.reference_number = clean_optional(self.reference_number);
        Ok(self)
    }

    /// Signed effect on the fund.
    pub fn fund_effect(&self) -> i64 {
        signed_amount(self.transaction_type, self.amount_cents)
    }
}

/// Body of `POST /transactions`.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(flatten)]
    pub transaction: TransactionRequest,

    /// Optional idempotency key to prevent duplicates
    pub idempotency_key: Option<String>,
}

/// Body of `PUT /transactions/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    #[serde(flatten)]
    pub transaction: TransactionRequest,
    pub version: i32,
}

/// Query string for `GET /transactions`.
///
/// Soft-deleted rows are excluded unless `include_deleted=true`.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub donor_id: Option<Uuid>,
    pub grant_id: Option<Uuid>,
    /// Matches description, payee or reference number
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl TransactionFilter {
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if from > to {
                return Err(AppError::InvalidRequest(
                    "from_date cannot be after to_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: TransactionType, amount: i64, donor: Option<Uuid>) -> TransactionRequest {
        TransactionRequest {
            transaction_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            amount_cents: amount,
            transaction_type: kind,
            description: " Spring appeal ".into(),
            payee: Some("".into()),
            reference_number: None,
            category_id: Uuid::new_v4(),
            fund_id: Uuid::new_v4(),
            donor_id: donor,
            grant_id: None,
        }
    }

    #[test]
    fn effect_sign_follows_type() {
        assert_eq!(signed_amount(TransactionType::Income, 500), 500);
        assert_eq!(signed_amount(TransactionType::Expense, 500), -500);
        assert_eq!(request(TransactionType::Expense, 42, None).fund_effect(), -42);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(request(TransactionType::Income, 0, None).validate().is_err());
        assert!(request(TransactionType::Income, -5, None).validate().is_err());
    }

    #[test]
    fn donor_only_on_income() {
        let donor = Some(Uuid::new_v4());
        assert!(request(TransactionType::Expense, 10, donor).validate().is_err());

        let ok = request(TransactionType::Income, 10, donor).validate().unwrap();
        assert_eq!(ok.description, "Spring appeal");
        assert_eq!(ok.payee, None);
    }

    #[test]
    fn filter_rejects_inverted_range() {
        let filter = TransactionFilter {
            from_date: NaiveDate::from_ymd_opt(2025, 2, 1),
            to_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
        assert!(TransactionFilter::default().validate().is_ok());
    }

    #[test]
    fn create_request_flattens_fields() {
        let body = r#"{
            "transaction_date": "2025-03-14",
            "amount_cents": 2500,
            "transaction_type": "expense",
            "description": "Paper",
            "category_id": "550e8400-e29b-41d4-a716-446655440000",
            "fund_id": "660e8400-e29b-41d4-a716-446655440001",
            "idempotency_key": "inv-77"
        }"#;
        let req: CreateTransactionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.idempotency_key.as_deref(), Some("inv-77"));
        assert_eq!(req.transaction.transaction_type, TransactionType::Expense);
    }
}
