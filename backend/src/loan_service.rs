//! Loan service layer - disbursement and repayment tracking

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::loan::Loan;
use crate::loan_request::{Actor, LoanRequest, LoanRequestStatus};
use crate::models::MemberRole;
use crate::store::{LoanStore, StoreError};

/// Loan service errors
#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Loan {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Loan request {0} is not approved")]
    NotApproved(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for LoanError {
    fn from(err: StoreError) -> Self {
        LoanError::Storage(err.to_string())
    }
}

/// Loan service for the disbursed side of the lifecycle
#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn LoanStore>,
    interest_rate_bps: i32,
}

impl LoanService {
    pub fn new(store: Arc<dyn LoanStore>, interest_rate_bps: i32) -> Self {
        Self {
            store,
            interest_rate_bps,
        }
    }

    /// The loan for an APPROVED request, creating it if it does not exist yet.
    ///
    /// Safe to call any number of times: a request never gets a second loan.
    pub async fn disburse(&self, request: &LoanRequest) -> Result<Loan, LoanError> {
        if request.status() != LoanRequestStatus::Approved {
            return Err(LoanError::NotApproved(request.id));
        }

        if let Some(existing) = self.store.find_loan_by_request(request.id).await? {
            return Ok(existing);
        }

        let loan = Loan::disburse(request, self.interest_rate_bps, Utc::now());
        let loan = match self.store.insert_loan(loan).await {
            Ok(loan) => loan,
            // Lost the race to a concurrent disbursement
            Err(StoreError::Duplicate(_)) => {
                return self
                    .store
                    .find_loan_by_request(request.id)
                    .await?
                    .ok_or(LoanError::NotFound(request.id));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            loan_id = %loan.id,
            loan_request_id = %request.id,
            amount = loan.amount,
            repayment_amount = loan.repayment_amount,
            "Loan disbursed"
        );

        Ok(loan)
    }

    pub async fn find_for_request(&self, loan_request_id: Uuid) -> Result<Option<Loan>, LoanError> {
        Ok(self.store.find_loan_by_request(loan_request_id).await?)
    }

    /// Loans owned by `member_id`
    pub async fn member_loans(&self, member_id: Uuid) -> Result<Vec<Loan>, LoanError> {
        Ok(self.store.list_loans(Some(member_id)).await?)
    }

    /// Every loan; restricted to office holders
    pub async fn all_loans(&self, actor: &Actor) -> Result<Vec<Loan>, LoanError> {
        if !actor.role.is_approver() {
            return Err(LoanError::Forbidden(
                "Only office holders can list all loans".to_string(),
            ));
        }
        Ok(self.store.list_loans(None).await?)
    }

    /// Record full repayment; only the treasurer keeps the books
    pub async fn mark_repaid(&self, actor: &Actor, loan_id: Uuid) -> Result<Loan, LoanError> {
        if actor.role != MemberRole::Treasurer {
            return Err(LoanError::Forbidden(
                "Only the treasurer can record repayments".to_string(),
            ));
        }

        let loan = self
            .store
            .mark_loan_repaid(loan_id, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => LoanError::NotFound(loan_id),
                other => other.into(),
            })?;

        tracing::info!(loan_id = %loan.id, by = %actor.member_id, "Loan marked repaid");
        Ok(loan)
    }
}
