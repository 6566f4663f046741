//! Member directory handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::{ApiJson, AuthenticatedMember};
use crate::error::ApiResult;
use crate::models::{AssignRoleRequest, MemberResponse};
use crate::state::AppState;

/// GET /members
pub async fn list_members(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state
        .auth_service
        .list_members(&member.to_actor())
        .await?;
    Ok(Json(members))
}

/// PUT /members/:id/role
pub async fn assign_role(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<AssignRoleRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let updated = state
        .auth_service
        .assign_role(&member.to_actor(), id, req.role)
        .await?;
    Ok(Json(updated.into()))
}
