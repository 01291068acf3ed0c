//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Extracts request data (JSON body, path, query string, caller identity)
//! 2. Delegates to the matching service
//! 3. Returns the HTTP response (JSON, status code)

/// Category endpoints
pub mod categories;
/// Donor endpoints
pub mod donors;
/// Fund endpoints
pub mod funds;
/// Grant endpoints
pub mod grants;
/// Health check endpoint
pub mod health;
/// Location and inventory endpoints
pub mod inventory;
/// Buildings, projects, work orders and service requests
pub mod maintenance;
/// Recurring transaction endpoints
pub mod recurring;
/// Transaction endpoints
pub mod transactions;
