//! Persistence for members, loan requests and loans
//!
//! Services talk to storage through the traits below. Two backends exist:
//! PostgreSQL for deployments and an in-memory store for development and
//! tests. Both guarantee that [`LoanRequestStore::mutate_request`] runs as an
//! atomic read-modify-write per request.

use axum::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::loan::Loan;
use crate::loan_request::{LedgerChange, LedgerError, LoanRequest, LoanRequestStatus};
use crate::models::{Member, MemberRole};

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Ledger operation applied inside the store's atomic section
pub type RequestMutation<'a> =
    Box<dyn FnOnce(&mut LoanRequest) -> Result<LedgerChange, LedgerError> + Send + 'a>;

#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Fails with `Duplicate` when the e-mail is already registered
    async fn insert_member(&self, member: Member) -> Result<Member, StoreError>;

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError>;

    /// E-mails are compared case-insensitively
    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, StoreError>;

    async fn list_members(&self) -> Result<Vec<Member>, StoreError>;

    async fn update_member_role(&self, id: Uuid, role: MemberRole) -> Result<Member, StoreError>;

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait LoanRequestStore: Send + Sync {
    async fn insert_request(&self, request: LoanRequest) -> Result<LoanRequest, StoreError>;

    async fn find_request(&self, id: Uuid) -> Result<Option<LoanRequest>, StoreError>;

    /// Unordered; callers apply the listing order
    async fn list_requests(
        &self,
        status: Option<LoanRequestStatus>,
        member_id: Option<Uuid>,
    ) -> Result<Vec<LoanRequest>, StoreError>;

    /// Load, mutate and persist one request while holding its lock. Nothing
    /// is written when the mutation fails or reports `Unchanged`.
    async fn mutate_request(
        &self,
        id: Uuid,
        mutation: RequestMutation<'_>,
    ) -> Result<(LoanRequest, LedgerChange), StoreError>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    /// At most one loan per request; a second insert fails with `Duplicate`
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError>;

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError>;

    async fn find_loan_by_request(
        &self,
        loan_request_id: Uuid,
    ) -> Result<Option<Loan>, StoreError>;

    async fn list_loans(&self, member_id: Option<Uuid>) -> Result<Vec<Loan>, StoreError>;

    /// Idempotent: an already repaid loan is returned unchanged
    async fn mark_loan_repaid(&self, id: Uuid, at: DateTime<Utc>) -> Result<Loan, StoreError>;
}

/// Everything the server persists
pub trait Store: MemberStore + LoanRequestStore + LoanStore {
    /// Short label for health reporting
    fn backend_name(&self) -> &'static str;
}
