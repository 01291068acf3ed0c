//! Nonprofit management service.
//!
//! REST API for a small nonprofit's books and buildings: funds, donors,
//! grants, categorized income and expense transactions, recurring
//! transactions, inventory, and building maintenance (projects, work orders,
//! service requests).

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
