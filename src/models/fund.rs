//! Fund models.
//!
//! A fund is a pool of money with its own balance. Restricted funds hold
//! donor- or grant-restricted money and may never be overdrawn.
//!
//! # Balance Storage
//!
//! Balances are stored as `i64` cents. `balance_cents` is never written by
//! clients after creation; it moves only with transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::error::AppError;

string_enum! {
    pub enum FundType {
        Restricted => "restricted",
        Unrestricted => "unrestricted",
    }
}

/// Represents a fund record from the database.
///
/// `version` is the optimistic concurrency token: every user edit
/// increments it, and edits must present the version they read.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Fund {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub fund_type: FundType,
    pub balance_cents: i64,
    /// Fundraising goal, if any
    pub target_cents: Option<i64>,
    pub is_active: bool,
    pub version: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Editable fund fields.
///
/// ```json
/// {
///   "name": "Building Fund",
///   "fund_type": "restricted",
///   "target_cents": 5000000
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub name: String,
    pub description: Option<String>,
    pub fund_type: FundType,
    pub target_cents: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl FundRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 100)?;
        self.name = self.name.trim().to_string();
        self.description = clean_optional(self.description);
        if matches!(self.target_cents, Some(target) if target <= 0) {
            return Err(AppError::InvalidRequest(
                "target_cents must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Body of `POST /funds`.
#[derive(Debug, Deserialize)]
pub struct CreateFundRequest {
    #[serde(flatten)]
    pub fund: FundRequest,

    /// Opening balance in cents (defaults to 0)
    #[serde(default)]
    pub opening_balance_cents: i64,
}

impl CreateFundRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.opening_balance_cents < 0 {
            return Err(AppError::InvalidRequest(
                "opening_balance_cents cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            fund: self.fund.validate()?,
            ..self
        })
    }
}

/// Body of `PUT /funds/{id}`: the fields plus the version the client read.
#[derive(Debug, Deserialize)]
pub struct UpdateFundRequest {
    #[serde(flatten)]
    pub fund: FundRequest,
    pub version: i32,
}

/// Query string for `GET /funds`.
#[derive(Debug, Default, Deserialize)]
pub struct FundFilter {
    pub fund_type: Option<FundType>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Totals for `GET /funds/{id}/summary`.
#[derive(Debug, Serialize)]
pub struct FundSummary {
    pub fund_id: Uuid,
    pub name: String,
    pub fund_type: FundType,
    pub balance_cents: i64,
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    pub transaction_count: i64,
    /// Percent of `target_cents` reached, when a target is set
    pub target_progress_percent: Option<f64>,
}

/// Percent of `target` covered by `balance`, rounded to one decimal.
pub fn progress_percent(balance_cents: i64, target_cents: Option<i64>) -> Option<f64> {
    let target = target_cents.filter(|t| *t > 0)?;
    let percent = balance_cents as f64 * 100.0 / target as f64;
    Some((percent * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_negative_opening_balance() {
        let req: CreateFundRequest = serde_json::from_str(
            r#"{"name":"General","fund_type":"unrestricted","opening_balance_cents":-1}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_requires_version() {
        let missing = serde_json::from_str::<UpdateFundRequest>(
            r#"{"name":"General","fund_type":"unrestricted"}"#,
        );
        assert!(missing.is_err());

        let ok: UpdateFundRequest = serde_json::from_str(
            r#"{"name":"General","fund_type":"unrestricted","version":4}"#,
        )
        .unwrap();
        assert_eq!(ok.version, 4);
        assert_eq!(ok.fund.fund_type, FundType::Unrestricted);
    }

    #[test]
    fn target_must_be_positive() {
        let req = FundRequest {
            name: "Roof".into(),
            description: None,
            fund_type: FundType::Restricted,
            target_cents: Some(0),
            is_active: true,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn progress_is_rounded_and_optional() {
        assert_eq!(progress_percent(33_333, Some(100_000)), Some(33.3));
        assert_eq!(progress_percent(150, Some(100)), Some(150.0));
        assert_eq!(progress_percent(10, None), None);
    }
}
