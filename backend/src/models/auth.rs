//! Authentication and member DTOs

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::MemberRole;

/// Request to register a new member
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub first_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 32))]
    pub npi: String,
    #[validate(length(min = 4, max = 32))]
    pub phone: String,
}

/// Login with e-mail and password
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Auth tokens response
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub member: MemberResponse,
}

/// Member as exposed by the API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: Uuid,
    pub name: String,
    pub first_name: String,
    pub email: String,
    pub role: MemberRole,
    pub npi: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Request to change a member's role
#[derive(Debug, Deserialize, Serialize)]
pub struct AssignRoleRequest {
    pub role: MemberRole,
}
