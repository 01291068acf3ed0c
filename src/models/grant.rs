//! Grant models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::error::AppError;

string_enum! {
    pub enum GrantStatus {
        Pending => "pending",
        Active => "active",
        Completed => "completed",
        Closed => "closed",
        Rejected => "rejected",
    }
}

/// Represents a grant record from the database.
///
/// `version` is the optimistic concurrency token.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Grant {
    pub id: Uuid,
    pub name: String,
    pub grantor: String,
    pub amount_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: GrantStatus,
    /// Fund the grant money is deposited into, if tracked separately
    pub fund_id: Option<Uuid>,
    pub notes: Option<String>,
    pub version: i32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Editable grant fields.
///
/// ```json
/// {
///   "name": "Youth Program 2025",
///   "grantor": "City Community Foundation",
///   "amount_cents": 2500000,
///   "start_date": "2025-01-01",
///   "end_date": "2025-12-31",
///   "status": "active"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub name: String,
    pub grantor: String,
    pub amount_cents: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_status")]
    pub status: GrantStatus,
    pub fund_id: Option<Uuid>,
    pub notes: Option<String>,
}

fn default_status() -> GrantStatus {
    GrantStatus::Pending
}

impl GrantRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 200)?;
        require_text("grantor", &self.grantor, 200)?;
        if self.amount_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "amount_cents must be positive".to_string(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(AppError::InvalidRequest(
                "end_date cannot be before start_date".to_string(),
            ));
        }
        self.name = self.name.trim().to_string();
        self.grantor = self.grantor.trim().to_string();
        self.notes = clean_optional(self.notes);
        Ok(self)
    }
}

/// Body of `PUT /grants/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateGrantRequest {
    #[serde(flatten)]
    pub grant: GrantRequest,
    pub version: i32,
}

/// Query string for `GET /grants`.
#[derive(Debug, Default, Deserialize)]
pub struct GrantFilter {
    pub status: Option<GrantStatus>,
    pub fund_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Response of `GET /grants/{id}/utilization`.
#[derive(Debug, Serialize, PartialEq)]
pub struct GrantUtilization {
    pub grant_id: Uuid,
    pub amount_cents: i64,
    pub spent_cents: i64,
    pub received_cents: i64,
    pub remaining_cents: i64,
    pub percent_used: f64,
    pub is_overspent: bool,
}

impl GrantUtilization {
    pub fn compute(grant_id: Uuid, amount_cents: i64, spent_cents: i64, received_cents: i64) -> Self {
        let percent_used = if amount_cents > 0 {
            ((spent_cents as f64 * 1000.0) / amount_cents as f64).round() / 10.0
        } else {
            0.0
        };
        Self {
            grant_id,
            amount_cents,
            spent_cents,
            received_cents,
            remaining_cents: amount_cents - spent_cents,
            percent_used,
            is_overspent: spent_cents > amount_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str, amount: i64) -> GrantRequest {
        GrantRequest {
            name: "Roof repair".into(),
            grantor: "Foundation".into(),
            amount_cents: amount,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            status: GrantStatus::Active,
            fund_id: None,
            notes: None,
        }
    }

    #[test]
    fn end_date_must_not_precede_start() {
        assert!(request("2025-06-01", "2025-05-31", 100).validate().is_err());
        assert!(request("2025-06-01", "2025-06-01", 100).validate().is_ok());
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(request("2025-01-01", "2025-12-31", 0).validate().is_err());
    }

    #[test]
    fn status_defaults_to_pending() {
        let req: GrantRequest = serde_json::from_str(
            r#"{"name":"A","grantor":"B","amount_cents":1,"start_date":"2025-01-01","end_date":"2025-02-01"}"#,
        )
        .unwrap();
        assert_eq!(req.status, GrantStatus::Pending);
    }

    #[test]
    fn utilization_reports_overspend() {
        let id = Uuid::new_v4();
        let u = GrantUtilization::compute(id, 10_000, 2_500, 10_000);
        assert_eq!(u.remaining_cents, 7_500);
        assert_eq!(u.percent_used, 25.0);
        assert!(!u.is_overspent);

        let over = GrantUtilization::compute(id, 10_000, 12_345, 0);
        assert_eq!(over.remaining_cents, -2_345);
        assert_eq!(over.percent_used, 123.5);
        assert!(over.is_overspent);
    }
}
