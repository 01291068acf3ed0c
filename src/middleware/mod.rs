//! HTTP middleware components.
//!
//! Middleware run before route handlers and may short-circuit a request.

/// API key authentication middleware
pub mod auth;
