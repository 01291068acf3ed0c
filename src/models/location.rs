//! Inventory storage locations, e.g. `Main Hall > Storage Closet > Shelf B`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::{error::AppError, services::hierarchy::TreeItem};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl TreeItem for Location {
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
pub struct LocationRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl LocationRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 100)?;
        self.name = self.name.trim().to_string();
        self.description = clean_optional(self.description);
        Ok(self)
    }
}
