//! Recurring transaction templates.
//!
//! A template describes a posting that repeats on a schedule. Occurrence `n`
//! is always computed from `start_date`, never from the previous occurrence,
//! so a monthly template starting on the 31st posts on Jan 31, Feb 28,
//! Mar 31 and so on without drifting.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::{
    error::AppError,
    models::transaction::{TransactionRequest, TransactionType},
};

/// Upper bound on postings generated for one template in one run.
pub const MAX_CATCH_UP: usize = 400;

string_enum! {
    pub enum Frequency {
        Daily => "daily",
        Weekly => "weekly",
        Biweekly => "biweekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

impl Frequency {
    /// Date of occurrence `n` (0-based) of a schedule starting at `start`.
    ///
    /// Month-based steps clamp to the last day of shorter months.
    pub fn occurrence(self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => start.checked_add_days(Days::new(u64::from(n))),
            Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(n))),
            Frequency::Biweekly => start.checked_add_days(Days::new(14 * u64::from(n))),
            Frequency::Monthly => start.checked_add_months(Months::new(n)),
            Frequency::Quarterly => n
                .checked_mul(3)
                .and_then(|m| start.checked_add_months(Months::new(m))),
            Frequency::Yearly => n
                .checked_mul(12)
                .and_then(|m| start.checked_add_months(Months::new(m))),
        }
    }
}

/// Represents a recurring transaction template from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RecurringTransaction {
    pub id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub payee: Option<String>,
    pub category_id: Uuid,
    pub fund_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub grant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_occurrence: NaiveDate,
    /// Occurrences already posted; the next one is index `occurrences_generated`
    pub occurrences_generated: i32,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Outcome of planning one template run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrencePlan {
    /// Dates to post, oldest first
    pub due: Vec<NaiveDate>,
    /// Value of `occurrences_generated` after posting `due`
    pub occurrences_generated: i32,
    /// Next scheduled date after `due`
    pub next_occurrence: Option<NaiveDate>,
    /// Whether the template should stay active
    pub still_active: bool,
}

impl RecurringTransaction {
    fn within_end(&self, date: NaiveDate) -> bool {
        self.end_date.is_none_or(|end| date <= end)
    }

    /// Work out which occurrences are due on `today`.
    ///
    /// Catches up on every missed occurrence up to `today`, bounded by
    /// [`MAX_CATCH_UP`]; the remainder is picked up by the next run.
    pub fn plan(&self, today: NaiveDate) -> OccurrencePlan {
        let mut n = u32::try_from(self.occurrences_generated.max(0)).unwrap_or(0);
        let mut due = Vec::new();

        let next = loop {
            let Some(date) = self.frequency.occurrence(self.start_date, n) else {
                break None;
            };
            if date > today || !self.within_end(date) || due.len() >= MAX_CATCH_UP {
                break Some(date);
            }
            due.push(date);
            n += 1;
        };

        let still_active = matches!(next, Some(date) if self.within_end(date));

        OccurrencePlan {
            due,
            occurrences_generated: i32::try_from(n).unwrap_or(i32::MAX),
            next_occurrence: next,
            still_active,
        }
    }

    /// The posting this template produces on `date`.
    pub fn posting_for(&self, date: NaiveDate) -> TransactionRequest {
        TransactionRequest {
            transaction_date: date,
            amount_cents: self.amount_cents,
            transaction_type: self.transaction_type,
            description: self.description.clone(),
            payee: self.payee.clone(),
            reference_number: None,
            category_id: self.category_id,
            fund_id: self.fund_id,
            donor_id: self.donor_id,
            grant_id: self.grant_id,
        }
    }

    /// Idempotency key of the posting for `date`.
    pub fn idempotency_key(&self, date: NaiveDate) -> String {
        format!("recurring:{}:{}", self.id, date)
    }
}

/// Request body for creating or replacing a template.
///
/// ```json
/// {
///   "description": "Monthly rent",
///   "amount_cents": 150000,
///   "transaction_type": "expense",
///   "category_id": "...",
///   "fund_id": "...",
///   "frequency": "monthly",
///   "start_date": "2025-01-31"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecurringRequest {
    pub description: String,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: Option<String>,
    pub category_id: Uuid,
    pub fund_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub grant_id: Option<Uuid>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl RecurringRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("description", &self.description, 500)?;
        if self.amount_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        if matches!(self.end_date, Some(end) if end < self.start_date) {
            return Err(AppError::InvalidRequest(
                "end_date cannot be before start_date".to_string(),
            ));
        }
        if self.donor_id.is_some() && self.transaction_type != TransactionType::Income {
            return Err(AppError::InvalidRequest(
                "Only income transactions can have a donor".to_string(),
            ));
        }
        self.description = self.description.trim().to_string();
        self.payee = clean_optional(self.payee);
        Ok(self)
    }
}

/// Query string for `GET /recurring-transactions`.
#[derive(Debug, Default, Deserialize)]
pub struct RecurringFilter {
    #[serde(default)]
    pub include_inactive: bool,
    pub fund_id: Option<Uuid>,
}

/// Result of one processing run.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct ProcessSummary {
    pub templates_processed: usize,
    pub transactions_created: usize,
    pub templates_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn template(frequency: Frequency, start: &str, end: Option<&str>, generated: i32) -> RecurringTransaction {
        let now = Utc::now();
        RecurringTransaction {
            id: Uuid::nil(),
            description: "Rent".into(),
            amount_cents: 150_000,
            transaction_type: TransactionType::Expense,
            payee: Some("Landlord".into()),
            category_id: Uuid::new_v4(),
            fund_id: Uuid::new_v4(),
            donor_id: None,
            grant_id: None,
            frequency,
            start_date: date(start),
            end_date: end.map(date),
            next_occurrence: date(start),
            occurrences_generated: generated,
            last_processed_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    #[test]
    fn monthly_occurrences_clamp_without_drift() {
        let start = date("2025-01-31");
        let dates: Vec<_> = (0..4)
            .map(|n| Frequency::Monthly.occurrence(start, n).unwrap())
            .collect();
        assert_eq!(
            dates,
            vec![
                date("2025-01-31"),
                date("2025-02-28"),
                date("2025-03-31"),
                date("2025-04-30")
            ]
        );
    }

    #[test]
    fn fixed_day_steps() {
        let start = date("2025-12-29");
        assert_eq!(Frequency::Weekly.occurrence(start, 1), Some(date("2026-01-05")));
        assert_eq!(Frequency::Biweekly.occurrence(start, 2), Some(date("2026-01-26")));
        assert_eq!(Frequency::Quarterly.occurrence(date("2024-11-30"), 1), Some(date("2025-02-28")));
        assert_eq!(Frequency::Yearly.occurrence(date("2024-02-29"), 1), Some(date("2025-02-28")));
        assert_eq!(Frequency::Yearly.occurrence(date("2024-02-29"), 4), Some(date("2028-02-29")));
    }

    #[test]
    fn plan_catches_up_missed_occurrences() {
        let t = template(Frequency::Monthly, "2025-01-15", None, 1);
        let plan = t.plan(date("2025-04-20"));
        assert_eq!(
            plan.due,
            vec![date("2025-02-15"), date("2025-03-15"), date("2025-04-15")]
        );
        assert_eq!(plan.occurrences_generated, 4);
        assert_eq!(plan.next_occurrence, Some(date("2025-05-15")));
        assert!(plan.still_active);
    }

    #[test]
    fn plan_includes_today_and_nothing_before_start() {
        let t = template(Frequency::Daily, "2025-06-10", None, 0);
        assert!(t.plan(date("2025-06-09")).due.is_empty());
        assert_eq!(t.plan(date("2025-06-10")).due, vec![date("2025-06-10")]);
    }

    #[test]
    fn plan_stops_at_end_date_and_deactivates() {
        let t = template(Frequency::Weekly, "2025-01-01", Some("2025-01-15"), 0);
        let plan = t.plan(date("2025-03-01"));
        assert_eq!(
            plan.due,
            vec![date("2025-01-01"), date("2025-01-08"), date("2025-01-15")]
        );
        assert!(!plan.still_active);
    }

    #[test]
    fn plan_bounds_catch_up() {
        let t = template(Frequency::Daily, "2020-01-01", None, 0);
        let plan = t.plan(date("2025-01-01"));
        assert_eq!(plan.due.len(), MAX_CATCH_UP);
        assert_eq!(plan.occurrences_generated, MAX_CATCH_UP as i32);
        assert!(plan.still_active);
        assert!(plan.next_occurrence.unwrap() <= date("2025-01-01"));
    }

    #[test]
    fn posting_carries_template_fields_and_stable_key() {
        let t = template(Frequency::Monthly, "2025-01-31", None, 0);
        let posting = t.posting_for(date("2025-02-28"));
        assert_eq!(posting.amount_cents, 150_000);
        assert_eq!(posting.transaction_date, date("2025-02-28"));
        assert_eq!(
            t.idempotency_key(date("2025-02-28")),
            "recurring:00000000-0000-0000-0000-000000000000:2025-02-28"
        );
    }

    #[test]
    fn request_validation() {
        let body = r#"{
            "description": "Gift",
            "amount_cents": 1000,
            "transaction_type": "expense",
            "category_id": "550e8400-e29b-41d4-a716-446655440000",
            "fund_id": "660e8400-e29b-41d4-a716-446655440001",
            "donor_id": "770e8400-e29b-41d4-a716-446655440002",
            "frequency": "monthly",
            "start_date": "2025-01-01"
        }"#;
        let req: RecurringRequest = serde_json::from_str(body).unwrap();
        assert!(req.validate().is_err());
    }
}
