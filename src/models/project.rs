//! Maintenance projects and the priority scale shared by maintenance records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::error::AppError;

string_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

string_enum! {
    pub enum ProjectStatus {
        Planned => "planned",
        InProgress => "in_progress",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planned
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub building_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub budget_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub building_id: Option<Uuid>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    pub budget_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

impl ProjectRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 200)?;
        if matches!(self.budget_cents, Some(b) if b < 0) {
            return Err(AppError::InvalidRequest(
                "budget_cents cannot be negative".to_string(),
            ));
        }
        if let (Some(start), Some(target)) = (self.start_date, self.target_date) {
            if target < start {
                return Err(AppError::InvalidRequest(
                    "target_date cannot be before start_date".to_string(),
                ));
            }
        }
        self.name = self.name.trim().to_string();
        self.description = clean_optional(self.description);
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub building_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_planned_medium() {
        let req: ProjectRequest = serde_json::from_str(r#"{"name":"Roof repair"}"#).unwrap();
        let req = req.validate().unwrap();
        assert_eq!(req.status, ProjectStatus::Planned);
        assert_eq!(req.priority, Priority::Medium);
    }

    #[test]
    fn target_before_start_is_rejected() {
        let req: ProjectRequest = serde_json::from_str(
            r#"{"name":"Boiler","start_date":"2025-06-01","target_date":"2025-05-01"}"#,
        )
        .unwrap();
        assert!(matches!(req.validate(), Err(AppError::InvalidRequest(_))));
    }
}
