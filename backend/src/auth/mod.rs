//! Authentication module
//!
//! - E-mail and password login with bcrypt hashes
//! - JWT access token generation and validation
//! - Token revocation on logout

mod jwt;
mod password;
mod service;

pub use jwt::{generate_access_token, verify_token, Claims, JwtError};
pub use password::{hash_password, verify_password};
pub use service::{AuthError, AuthService};
