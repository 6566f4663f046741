//! Authentication extractor
//!
//! Verifies the bearer token and loads the calling member.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthError, AuthService};
use crate::error::{ApiError, ErrorDetails, ErrorResponse};
use crate::loan_request::Actor;
use crate::models::MemberRole;

/// Authenticated member extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthenticatedMember {
    pub member_id: Uuid,
    pub email: String,
    /// Current role as stored, not as issued in the token
    pub role: MemberRole,
    pub jti: String,
    /// Token expiry (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedMember {
    pub fn to_actor(&self) -> Actor {
        Actor::new(self.member_id, self.role)
    }
}

fn unauthorized(code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetails {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Extractor for authenticated members
///
/// ```rust,ignore
/// async fn protected_handler(member: AuthenticatedMember) -> impl IntoResponse {
///     format!("Hello, member {}", member.member_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedMember
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    unauthorized(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let (member, claims) = auth_service
            .authenticate(bearer.token())
            .await
            .map_err(|e| match e {
                AuthError::TokenExpired => unauthorized("TOKEN_EXPIRED", "Token has expired"),
                AuthError::TokenRevoked => {
                    unauthorized("SESSION_REVOKED", "Session has been revoked")
                }
                AuthError::InvalidToken(_) => unauthorized("INVALID_TOKEN", "Invalid token"),
                other => ApiError::from(other).into_response(),
            })?;

        Ok(AuthenticatedMember {
            member_id: member.id,
            email: member.email,
            role: member.role,
            jti: claims.jti,
            expires_at: claims.exp,
        })
    }
}
