//! Approval service: the only writer of the approval ledger

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::dto::CreateLoanRequest;
use super::model::{ApproverRole, LedgerChange, LedgerError, LoanRequest, LoanRequestStatus};
use super::query::{self, RequestFilter, StatusCounts, ValidatorStats};
use crate::loan::Loan;
use crate::loan_service::{LoanError, LoanService};
use crate::models::MemberRole;
use crate::store::{LoanRequestStore, StoreError};

/// Approval service errors
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Loan request {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApprovalError {
    fn from_store(id: Uuid) -> impl Fn(StoreError) -> ApprovalError {
        move |err| match err {
            StoreError::NotFound => ApprovalError::NotFound(id),
            StoreError::Ledger(e) => e.into(),
            other => ApprovalError::Storage(other.to_string()),
        }
    }
}

impl From<LedgerError> for ApprovalError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Terminal(_) => ApprovalError::Forbidden(err.to_string()),
            LedgerError::MissingReason => ApprovalError::InvalidArgument(err.to_string()),
        }
    }
}

impl From<StoreError> for ApprovalError {
    fn from(err: StoreError) -> Self {
        ApprovalError::Storage(err.to_string())
    }
}

/// The authenticated caller of a service operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub member_id: Uuid,
    pub role: MemberRole,
}

impl Actor {
    pub fn new(member_id: Uuid, role: MemberRole) -> Self {
        Self { member_id, role }
    }

    /// The caller may only exercise the slot matching their own role
    fn require_role(&self, role: ApproverRole) -> Result<(), ApprovalError> {
        if self.role.approver_role() == Some(role) {
            Ok(())
        } else {
            Err(ApprovalError::Forbidden(format!(
                "A {} cannot act as {}",
                self.role, role
            )))
        }
    }

    fn require_approver(&self) -> Result<ApproverRole, ApprovalError> {
        self.role.approver_role().ok_or_else(|| {
            ApprovalError::Forbidden("Only office holders can review loan requests".to_string())
        })
    }
}

/// Loan request lifecycle service
#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn LoanRequestStore>,
    loans: LoanService,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn LoanRequestStore>, loans: LoanService) -> Self {
        Self { store, loans }
    }

    /// Submit a new PENDING request owned by the caller
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateLoanRequest,
    ) -> Result<LoanRequest, ApprovalError> {
        request
            .validate()
            .map_err(|e| ApprovalError::InvalidArgument(e.to_string()))?;

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(ApprovalError::InvalidArgument(
                "A reason is required".to_string(),
            ));
        }

        let loan_request = LoanRequest::new(
            actor.member_id,
            request.request_amount,
            reason.to_string(),
            request.duration,
            Utc::now(),
        );
        let created = self.store.insert_request(loan_request).await?;

        tracing::info!(
            loan_request_id = %created.id,
            member_id = %created.member_id,
            amount = created.request_amount,
            "Loan request submitted"
        );

        Ok(created)
    }

    /// Record `role`'s approval of request `id`.
    ///
    /// Fails with `Forbidden` when the caller does not hold `role` or the
    /// request is already APPROVED or REJECTED. Approving twice is a no-op.
    pub async fn approve(
        &self,
        actor: &Actor,
        id: Uuid,
        role: ApproverRole,
        comment: Option<String>,
    ) -> Result<LoanRequest, ApprovalError> {
        actor.require_role(role).map_err(|e| {
            tracing::warn!(loan_request_id = %id, caller = %actor.member_id, %role, "Approval refused: role mismatch");
            e
        })?;

        let now = Utc::now();
        let (request, change) = self
            .store
            .mutate_request(id, Box::new(move |r: &mut LoanRequest| r.approve(role, comment, now)))
            .await
            .map_err(ApprovalError::from_store(id))?;

        match change {
            LedgerChange::Applied { from, to } => {
                tracing::info!(
                    loan_request_id = %id,
                    %role,
                    from = %from,
                    to = %to,
                    "Loan request approved by role"
                );
            }
            LedgerChange::Unchanged => {
                tracing::debug!(loan_request_id = %id, %role, "Repeat approval ignored");
            }
        }

        if change.completed_approval() {
            // The approval stays committed; `disburse_pending` or the
            // treasurer's `disburse` picks the loan up later.
            if let Err(e) = self.loans.disburse(&request).await {
                tracing::error!(
                    loan_request_id = %id,
                    error = %e,
                    "Loan disbursement failed, request left awaiting disbursement"
                );
            }
        }

        Ok(request)
    }

    /// Create the loan for an APPROVED request that has none. Treasurer only.
    pub async fn disburse(&self, actor: &Actor, id: Uuid) -> Result<Loan, ApprovalError> {
        actor.require_role(ApproverRole::Treasurer)?;

        let request = self
            .store
            .find_request(id)
            .await?
            .ok_or(ApprovalError::NotFound(id))?;

        self.loans.disburse(&request).await.map_err(|e| match e {
            LoanError::NotApproved(_) => ApprovalError::Forbidden(format!(
                "Loan request is {} and cannot be disbursed",
                request.status()
            )),
            other => ApprovalError::Storage(other.to_string()),
        })
    }

    /// Disburse every APPROVED request still missing its loan.
    ///
    /// Returns the number of loans created. Failures are logged and left for
    /// the next sweep.
    pub async fn disburse_pending(&self) -> Result<usize, ApprovalError> {
        let approved = self
            .store
            .list_requests(Some(LoanRequestStatus::Approved), None)
            .await?;

        let mut created = 0;
        for request in &approved {
            match self.loans.find_for_request(request.id).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(loan_request_id = %request.id, error = %e, "Loan lookup failed");
                    continue;
                }
            }
            match self.loans.disburse(request).await {
                Ok(_) => created += 1,
                Err(e) => {
                    tracing::warn!(loan_request_id = %request.id, error = %e, "Pending disbursement failed");
                }
            }
        }

        if created > 0 {
            tracing::info!(created, "Disbursed loans for approved requests");
        }
        Ok(created)
    }

    /// Reject request `id` on behalf of `role`. Terminal.
    pub async fn reject(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: &str,
        role: ApproverRole,
    ) -> Result<LoanRequest, ApprovalError> {
        actor.require_role(role)?;

        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(LedgerError::MissingReason.into());
        }

        let now = Utc::now();
        let (request, _) = self
            .store
            .mutate_request(
                id,
                Box::new(move |r: &mut LoanRequest| r.reject(role, &reason, now)),
            )
            .await
            .map_err(ApprovalError::from_store(id))?;

        tracing::info!(loan_request_id = %id, %role, "Loan request rejected");
        Ok(request)
    }

    /// A single request, visible to its owner and to office holders
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<LoanRequest, ApprovalError> {
        let request = self
            .store
            .find_request(id)
            .await?
            .ok_or(ApprovalError::NotFound(id))?;

        if request.member_id != actor.member_id && !actor.role.is_approver() {
            return Err(ApprovalError::Forbidden(
                "You can only view your own loan requests".to_string(),
            ));
        }
        Ok(request)
    }

    /// All requests matching `filter`, newest first
    pub async fn list(
        &self,
        actor: &Actor,
        filter: RequestFilter,
    ) -> Result<Vec<LoanRequest>, ApprovalError> {
        actor.require_approver()?;
        let requests = self.store.list_requests(filter.status(), None).await?;
        Ok(query::filter_and_sort(requests, filter))
    }

    /// The caller's own requests, newest first
    pub async fn member_requests(&self, actor: &Actor) -> Result<Vec<LoanRequest>, ApprovalError> {
        let requests = self
            .store
            .list_requests(None, Some(actor.member_id))
            .await?;
        Ok(query::filter_and_sort(requests, RequestFilter::All))
    }

    pub async fn status_counts(&self, actor: &Actor) -> Result<StatusCounts, ApprovalError> {
        actor.require_approver()?;
        let requests = self.store.list_requests(None, None).await?;
        Ok(StatusCounts::tally(&requests))
    }

    pub async fn validator_stats(&self, actor: &Actor) -> Result<ValidatorStats, ApprovalError> {
        Ok(self.status_counts(actor).await?.into())
    }

    /// Requests the caller approved in their office
    pub async fn approval_history(&self, actor: &Actor) -> Result<Vec<LoanRequest>, ApprovalError> {
        let role = actor.require_approver()?;
        let requests = self.store.list_requests(None, None).await?;
        Ok(query::approval_history(requests, role))
    }
}
