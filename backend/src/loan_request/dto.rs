//! Request bodies, query strings and the response view for the loan request
//! endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::model::{ApproverRole, LoanRequest, LoanRequestStatus};

/// Body of `POST /loan_request`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    #[validate(range(min = 1, message = "request amount must be positive"))]
    pub request_amount: i64,
    #[validate(length(min = 1, max = 2000, message = "a reason is required"))]
    pub reason: String,
    /// Repayment term in months
    #[validate(range(min = 1, max = 120, message = "duration must be between 1 and 120 months"))]
    pub duration: i32,
}

/// Body of `POST /loan_request/{id}/approve/{role}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApproveBody {
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of `POST /loan_request/{id}/reject`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    #[serde(default)]
    pub rejection_reason: String,
    pub rejected_by_role: ApproverRole,
}

/// `?status=` on the list endpoints; absent means ALL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

/// JSON view of a loan request, flat with one field triple per approver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequestView {
    pub id: Uuid,
    pub member_id: Uuid,
    pub request_amount: i64,
    pub reason: String,
    pub request_date: DateTime<Utc>,
    pub duration: i32,
    pub status: LoanRequestStatus,
    pub president_approved: bool,
    pub president_approval_date: Option<DateTime<Utc>>,
    pub president_comment: Option<String>,
    pub secretary_approved: bool,
    pub secretary_approval_date: Option<DateTime<Utc>>,
    pub secretary_comment: Option<String>,
    pub treasurer_approved: bool,
    pub treasurer_approval_date: Option<DateTime<Utc>>,
    pub treasurer_comment: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejected_by_role: Option<ApproverRole>,
    pub rejection_date: Option<DateTime<Utc>>,
    pub approved_count: u32,
    pub approval_percentage: u32,
    pub total_approvers: u32,
}

impl LoanRequestView {
    pub fn is_approved_by(&self, role: ApproverRole) -> bool {
        match role {
            ApproverRole::President => self.president_approved,
            ApproverRole::Secretary => self.secretary_approved,
            ApproverRole::Treasurer => self.treasurer_approved,
        }
    }
}

impl From<&LoanRequest> for LoanRequestView {
    fn from(request: &LoanRequest) -> Self {
        let ledger = request.ledger();
        let progress = request.progress();
        let rejection = ledger.rejection();

        Self {
            id: request.id,
            member_id: request.member_id,
            request_amount: request.request_amount,
            reason: request.reason.clone(),
            request_date: request.request_date,
            duration: request.duration_months,
            status: request.status(),
            president_approved: ledger.president.approved,
            president_approval_date: ledger.president.approval_date,
            president_comment: ledger.president.comment.clone(),
            secretary_approved: ledger.secretary.approved,
            secretary_approval_date: ledger.secretary.approval_date,
            secretary_comment: ledger.secretary.comment.clone(),
            treasurer_approved: ledger.treasurer.approved,
            treasurer_approval_date: ledger.treasurer.approval_date,
            treasurer_comment: ledger.treasurer.comment.clone(),
            rejection_reason: rejection.map(|r| r.reason.clone()),
            rejected_by_role: rejection.map(|r| r.rejected_by),
            rejection_date: rejection.map(|r| r.rejected_at),
            approved_count: progress.approved_count,
            approval_percentage: progress.approval_percentage,
            total_approvers: progress.total_approvers,
        }
    }
}

impl From<LoanRequest> for LoanRequestView {
    fn from(request: LoanRequest) -> Self {
        Self::from(&request)
    }
}
