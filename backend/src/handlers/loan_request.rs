//! Loan request HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{ApiJson, AuthenticatedMember};
use crate::error::{ApiError, ApiResult};
use crate::loan::Loan;
use crate::loan_request::{
    ApproveBody, ApproverRole, CreateLoanRequest, ListRequestsQuery, LoanRequest,
    LoanRequestView, RejectBody, RequestFilter, StatusCounts, ValidatorStats,
};
use crate::state::AppState;

fn views(requests: Vec<LoanRequest>) -> Json<Vec<LoanRequestView>> {
    Json(requests.into_iter().map(LoanRequestView::from).collect())
}

/// GET /loan_request and /loan_request/all - every request, `?status=` filters
pub async fn list_requests(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<Vec<LoanRequestView>>> {
    let filter = match query.status.as_deref() {
        Some(status) => status.parse::<RequestFilter>().map_err(ApiError::ValidationError)?,
        None => RequestFilter::All,
    };

    let requests = state
        .approval_service
        .list(&member.to_actor(), filter)
        .await?;
    Ok(views(requests))
}

/// GET /loan_request/my-requests
pub async fn my_requests(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<Vec<LoanRequestView>>> {
    let requests = state
        .approval_service
        .member_requests(&member.to_actor())
        .await?;
    Ok(views(requests))
}

/// POST /loan_request
pub async fn create_request(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    ApiJson(body): ApiJson<CreateLoanRequest>,
) -> ApiResult<(StatusCode, Json<LoanRequestView>)> {
    let created = state
        .approval_service
        .create(&member.to_actor(), body)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /loan_request/:id
pub async fn get_request(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LoanRequestView>> {
    let request = state.approval_service.get(&member.to_actor(), id).await?;
    Ok(Json(request.into()))
}

/// POST /loan_request/:id/approve/:role
///
/// The body is optional; a missing or empty body approves without comment.
pub async fn approve_request(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path((id, role)): Path<(Uuid, String)>,
    body: Option<Json<ApproveBody>>,
) -> ApiResult<Json<LoanRequestView>> {
    let role: ApproverRole = role.parse().map_err(ApiError::ValidationError)?;
    let comment = body.and_then(|Json(b)| b.comment);

    let request = state
        .approval_service
        .approve(&member.to_actor(), id, role, comment)
        .await?;
    Ok(Json(request.into()))
}

/// POST /loan_request/:id/reject
pub async fn reject_request(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<Json<LoanRequestView>> {
    let request = state
        .approval_service
        .reject(
            &member.to_actor(),
            id,
            &body.rejection_reason,
            body.rejected_by_role,
        )
        .await?;
    Ok(Json(request.into()))
}

/// POST /loan_request/:id/disburse - create the loan an APPROVED request is missing
pub async fn disburse_request(
    State(state): State<AppState>,
    member: AuthenticatedMember,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Loan>> {
    let loan = state
        .approval_service
        .disburse(&member.to_actor(), id)
        .await?;
    Ok(Json(loan))
}

/// GET /loan_request/validator-stats
pub async fn validator_stats(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<ValidatorStats>> {
    let stats = state
        .approval_service
        .validator_stats(&member.to_actor())
        .await?;
    Ok(Json(stats))
}

/// GET /loan_request/stats
pub async fn status_counts(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<StatusCounts>> {
    let counts = state
        .approval_service
        .status_counts(&member.to_actor())
        .await?;
    Ok(Json(counts))
}

/// GET /loan-validator/my-approval-history
pub async fn my_approval_history(
    State(state): State<AppState>,
    member: AuthenticatedMember,
) -> ApiResult<Json<Vec<LoanRequestView>>> {
    let requests = state
        .approval_service
        .approval_history(&member.to_actor())
        .await?;
    Ok(views(requests))
}
