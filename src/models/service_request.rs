//! Maintenance service requests submitted by staff or volunteers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, looks_like_email, project::Priority, require_text};
use crate::error::AppError;

string_enum! {
    pub enum ServiceRequestStatus {
        Submitted => "submitted",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
    }
}

impl ServiceRequestStatus {
    /// Whether a reviewer may still approve or reject.
    pub fn is_reviewable(self) -> bool {
        matches!(
            self,
            ServiceRequestStatus::Submitted | ServiceRequestStatus::UnderReview
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub building_id: Option<Uuid>,
    pub requested_by: String,
    pub contact_email: Option<String>,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    #[sqlx(try_from = "String")]
    pub status: ServiceRequestStatus,
    pub review_note: Option<String>,
    /// Work order created from this request, at most one
    pub work_order_id: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceRequestRequest {
    pub title: String,
    pub description: String,
    pub building_id: Option<Uuid>,
    pub requested_by: String,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl ServiceRequestRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("title", &self.title, 200)?;
        require_text("description", &self.description, 4000)?;
        require_text("requested_by", &self.requested_by, 100)?;
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.requested_by = self.requested_by.trim().to_string();
        self.contact_email = clean_optional(self.contact_email).map(|e| e.to_lowercase());
        if let Some(email) = &self.contact_email {
            if !looks_like_email(email) {
                return Err(AppError::InvalidRequest(
                    "contact_email is not a valid e-mail address".to_string(),
                ));
            }
        }
        Ok(self)
    }
}

/// Body of `POST /service-requests/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceRequestFilter {
    pub status: Option<ServiceRequestStatus>,
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
    fn only_pending_requests_are_reviewable() {
        assert!(ServiceRequestStatus::Submitted.is_reviewable());
        assert!(ServiceRequestStatus::UnderReview.is_reviewable());
        assert!(!ServiceRequestStatus::Approved.is_reviewable());
        assert!(!ServiceRequestStatus::Rejected.is_reviewable());
    }

    #[test]
    fn contact_email_is_checked() {
        let req: ServiceRequestRequest = serde_json::from_str(
            r#"{"title":"Leak","description":"Kitchen sink","requested_by":"Sam","contact_email":"not-an-email"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
