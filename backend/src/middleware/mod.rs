//! Middleware for the Mutuelle API
//!
//! Request tracing, security headers, member authentication and JSON bodies.

pub mod auth;
mod json;
mod security;
mod tracing;

pub use auth::AuthenticatedMember;
pub use json::ApiJson;
pub use security::{hsts_header, security_headers};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
