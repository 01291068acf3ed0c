use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::{error::AppError, services::hierarchy::TreeItem};

/// A building or an area inside one (floor, wing, room).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl TreeItem for Building {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildingRequest {
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl BuildingRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 100)?;
        self.name = self.name.trim().to_string();
        self.address = clean_optional(self.address);
        self.description = clean_optional(self.description);
        if self.address.as_ref().is_some_and(|a| a.chars().count() > 300) {
            return Err(AppError::InvalidRequest(
                "address must be at most 300 characters".to_string(),
            ));
        }
        Ok(self)
    }
}
