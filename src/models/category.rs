//! Income/expense categories.
//!
//! Categories form a tree: a category may have a parent of the same type,
//! e.g. `Utilities > Electric`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::{error::AppError, services::hierarchy::TreeItem};

string_enum! {
    /// Direction of money a category (and its transactions) describes.
    pub enum TransactionType {
        Income => "income",
        Expense => "expense",
    }
}

/// Represents a category record from the database.
///
/// Maps to the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub category_type: TransactionType,
    pub parent_id: Option<Uuid>,
    /// Display colour, e.g. `#2e7d32`
    pub color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl TreeItem for Category {
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

/// Request body for creating or replacing a category.
///
/// ```json
/// {
///   "name": "Electric",
///   "category_type": "expense",
///   "parent_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_type: TransactionType,
    pub parent_id: Option<Uuid>,
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CategoryRequest {
    /// Trim text fields and check lengths.
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 100)?;
        self.name = self.name.trim().to_string();
        self.description = clean_optional(self.description);
        self.color = clean_optional(self.color);

        if let Some(color) = &self.color {
            let hex = color.strip_prefix('#').unwrap_or(color);
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AppError::InvalidRequest(
                    "color must be a hex value like #1a2b3c".to_string(),
                ));
            }
        }

        Ok(self)
    }
}

/// Query string for `GET /categories`.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub category_type: Option<TransactionType>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, color: Option<&str>) -> CategoryRequest {
        CategoryRequest {
            name: name.to_string(),
            description: Some("   ".to_string()),
            category_type: TransactionType::Expense,
            parent_id: None,
            color: color.map(str::to_string),
            is_active: true,
        }
    }

    #[test]
    fn validate_trims_and_clears_blank_description() {
        let req = request("  Rent ", None).validate().unwrap();
        assert_eq!(req.name, "Rent");
        assert_eq!(req.description, None);
    }

    #[test]
    fn validate_checks_color_format() {
        assert!(request("Rent", Some("#00ff7A")).validate().is_ok());
        assert!(request("Rent", Some("green")).validate().is_err());
    }

    #[test]
    fn deserializes_type_from_snake_case() {
        let req: CategoryRequest =
            serde_json::from_str(r#"{"name":"Gifts","category_type":"income"}"#).unwrap();
        assert_eq!(req.category_type, TransactionType::Income);
        assert!(req.is_active);
    }
}
