//! Loan handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::AuthenticatedMember;
use crate::error::ApiResult;
use crate::loan::Loan;
use crate::state::AppState;

/// GET /loan/my-loans
pub async fn my_loans(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<Vec<Loan>>> {
    let loans = state.loan_service.member_loans(member.member_id).await?;
    Ok(Json(loans))
}

/// GET /loan
pub async fn list_loans(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<Vec<Loan>>> {
    let loans = state.loan_service.all_loans(&member.to_actor()).await?;
    Ok(Json(loans))
}

/// POST /loan/:id/repaid
pub async fn mark_repaid(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Loan>> {
    let loan = state
        .loan_service
        .mark_repaid(&member.to_actor(), id)
        .await?;
    Ok(Json(loan))
}
