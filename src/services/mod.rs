//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and cross-entity rules.

pub mod building_service;
pub mod category_service;
pub mod donor_service;
pub mod fund_service;
pub mod grant_service;
pub mod hierarchy;
pub mod inventory_service;
pub mod location_service;
pub mod project_service;
pub mod records;
pub mod recurring_service;
pub mod service_request_service;
pub mod transaction_service;
pub mod work_order_service;
