//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiJson, AuthenticatedMember};
use crate::error::ApiResult;
use crate::models::{AuthTokensResponse, LoginRequest, MemberResponse, RegisterRequest};
use crate::state::AppState;

/// POST /auth/register - create a member account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let member = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

/// POST /auth/login - exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthTokensResponse>> {
    let tokens = state.auth_service.login(req).await?;
    Ok(Json(tokens))
}

/// GET /auth/me - the calling member
pub async fn me(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<MemberResponse>> {
    let member = state.auth_service.get_member(member.member_id).await?;
    Ok(Json(member.into()))
}

/// POST /auth/logout - revoke the presented token
pub async fn logout(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<StatusCode> {
    state
        .auth_service
        .logout(&member.jti, member.expires_at)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
