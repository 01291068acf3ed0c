//! Inventory items and stock adjustments.
//!
//! Quantity never goes below zero. Every change to stock after creation is
//! recorded as an `InventoryAdjustment` with a reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    /// Stock keeping unit, unique among live items
    pub sku: Option<String>,
    pub description: Option<String>,
    /// Free-text grouping, e.g. "Cleaning supplies"
    pub category: Option<String>,
    pub location_id: Option<Uuid>,
    pub quantity: i32,
    pub unit: String,
    pub unit_cost_cents: Option<i64>,
    /// Quantity at or below which the item counts as low stock
    pub reorder_level: Option<i32>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// One stock movement.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// Editable item fields. Quantity is not editable here; use adjustments.
#[derive(Debug, Deserialize)]
pub struct InventoryItemRequest {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location_id: Option<Uuid>,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_cost_cents: Option<i64>,
    pub reorder_level: Option<i32>,
}

fn default_unit() -> String {
    "each".to_string()
}

impl InventoryItemRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        require_text("name", &self.name, 200)?;
        require_text("unit", &self.unit, 32)?;
        if matches!(self.unit_cost_cents, Some(cost) if cost < 0) {
            return Err(AppError::InvalidRequest(
                "unit_cost_cents cannot be negative".to_string(),
            ));
        }
        if matches!(self.reorder_level, Some(level) if level < 0) {
            return Err(AppError::InvalidRequest(
                "reorder_level cannot be negative".to_string(),
            ));
        }
        self.name = self.name.trim().to_string();
        self.unit = self.unit.trim().to_string();
        self.sku = clean_optional(self.sku).map(|s| s.to_uppercase());
        self.description = clean_optional(self.description);
        self.category = clean_optional(self.category);
        Ok(self)
    }
}

/// Body of `POST /inventory`.
#[derive(Debug, Deserialize)]
pub struct CreateInventoryItemRequest {
    #[serde(flatten)]
    pub item: InventoryItemRequest,
    #[serde(default)]
    pub initial_quantity: i32,
}

/// Body of `POST /inventory/{id}/adjustments`.
///
/// ```json
/// { "quantity_change": -3, "reason": "Used for winter shelter" }
/// ```
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub quantity_change: i32,
    pub reason: String,
}

impl AdjustmentRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        if self.quantity_change == 0 {
            return Err(AppError::InvalidRequest(
                "quantity_change cannot be zero".to_string(),
            ));
        }
        require_text("reason", &self.reason, 500)?;
        self.reason = self.reason.trim().to_string();
        Ok(self)
    }
}

/// Quantity after applying `change` to `current`, if it stays non-negative.
pub fn apply_change(current: i32, change: i32) -> Result<i32, AppError> {
    match current.checked_add(change) {
        Some(after) if after >= 0 => Ok(after),
        Some(_) => Err(AppError::InsufficientBalance(format!(
            "Only {current} in stock; cannot remove {}",
            change.unsigned_abs()
        ))),
        None => Err(AppError::InvalidRequest(
            "quantity_change out of range".to_string(),
        )),
    }
}

/// Query string for `GET /inventory`.
#[derive(Debug, Default, Deserialize)]
pub struct InventoryFilter {
    pub location_id: Option<Uuid>,
    /// Matches name, SKU or category
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_cannot_go_negative() {
        assert_eq!(apply_change(5, -5).unwrap(), 0);
        assert_eq!(apply_change(5, 3).unwrap(), 8);
        assert!(matches!(
            apply_change(2, -3),
            Err(AppError::InsufficientBalance(_))
        ));
        assert!(matches!(
            apply_change(i32::MAX, 1),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn adjustment_needs_change_and_reason() {
        let zero = AdjustmentRequest { quantity_change: 0, reason: "count".into() };
        assert!(zero.validate().is_err());
        let blank = AdjustmentRequest { quantity_change: 1, reason: " ".into() };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn request_defaults_unit_and_normalises_sku() {
        let req: CreateInventoryItemRequest =
            serde_json::from_str(r#"{"name":"Folding chair","sku":" fc-01 ","initial_quantity":12}"#)
                .unwrap();
        assert_eq!(req.initial_quantity, 12);
        let item = req.item.validate().unwrap();
        assert_eq!(item.unit, "each");
        assert_eq!(item.sku.as_deref(), Some("FC-01"));
    }
}
