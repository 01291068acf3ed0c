//! Work orders.
//!
//! Status moves through a fixed lifecycle:
//!
//! ```text
//! open ──► in_progress ──► completed
//!   │  ▲        │  ▲
//!   ▼  │        ▼  │
//!   on_hold ◄───┘  │          any non-terminal ──► cancelled
//!      └───────────┘
//! ```
//!
//! `completed` and `cancelled` are terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, project::Priority, require_text};
use crate::error::AppError;

string_enum! {
    pub enum WorkOrderStatus {
        Open => "open",
        InProgress => "in_progress",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl WorkOrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        match self {
            Open => matches!(next, InProgress | OnHold | Completed | Cancelled),
            InProgress => matches!(next, OnHold | Completed | Cancelled),
            OnHold => matches!(next, Open | InProgress | Cancelled),
            Completed | Cancelled => false,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub building_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: WorkOrderStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub estimated_cost_cents: Option<i64>,
    pub actual_cost_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Editable work order fields. Status changes go through
/// [`StatusChangeRequest`].
#[derive(Debug, Deserialize)]
pub struct WorkOrderRequest {
    pub title: String,
    pub description: Option<String>,
    pub building_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub estimated_cost_cents: Option<i64>,
    pub actual_cost_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

impl WorkOrderRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("title", &self.title, 200)?;
        for (field, value) in [
            ("estimated_cost_cents", self.estimated_cost_cents),
            ("actual_cost_cents", self.actual_cost_cents),
        ] {
            if matches!(value, Some(v) if v < 0) {
                return Err(AppError::InvalidRequest(format!(
                    "{field} cannot be negative"
                )));
            }
        }
        self.title = self.title.trim().to_string();
        self.description = clean_optional(self.description);
        self.assigned_to = clean_optional(self.assigned_to);
        Ok(self)
    }
}

/// Body of `POST /work-orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: WorkOrderStatus,
    /// Recorded when completing, if given
    pub actual_cost_cents: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<Priority>,
    pub building_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<String>,
    /// Only non-terminal orders whose due date has passed
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::WorkOrderStatus::{self, *};

    const ALL: [WorkOrderStatus; 5] = [Open, InProgress, OnHold, Completed, Cancelled];

    #[test]
    fn terminal_states_have_no_exits() {
        for next in ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn status_never_transitions_to_itself() {
        for status in ALL {
            assert!(!status.can_transition_to(status), "{status}");
        }
    }

    #[test]
    fn lifecycle_edges() {
        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(OnHold));
        assert!(OnHold.can_transition_to(Open));
        assert!(OnHold.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Open));
        assert!(!OnHold.can_transition_to(Completed));
    }

    #[test]
    fn anything_open_can_be_cancelled() {
        for status in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(Cancelled));
        }
    }
}
