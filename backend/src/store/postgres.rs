//! PostgreSQL store

use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{LoanRequestStore, LoanStore, MemberStore, RequestMutation, Store, StoreError};
use crate::loan::Loan;
use crate::loan_request::{
    ApprovalLedger, ApproverRole, LedgerChange, LoanRequest, LoanRequestStatus, Rejection,
    RoleApproval,
};
use crate::models::{Member, MemberRole};

const MEMBER_COLUMNS: &str =
    "id, name, first_name, email, password_hash, role, npi, phone, created_at";

const REQUEST_COLUMNS: &str = r#"
    id, member_id, request_amount, reason, request_date, duration_months, status,
    president_approved, president_approval_date, president_comment,
    secretary_approved, secretary_approval_date, secretary_comment,
    treasurer_approved, treasurer_approval_date, treasurer_comment,
    rejection_reason, rejected_by_role, rejection_date
"#;

const LOAN_COLUMNS: &str = r#"
    id, loan_request_id, member_id, amount, begin_date, end_date,
    interest_rate_bps, repayment_amount, is_repaid, repaid_at
"#;

/// Flat row layout of `loan_requests`
#[derive(Debug, sqlx::FromRow)]
struct LoanRequestRow {
    id: Uuid,
    member_id: Uuid,
    request_amount: i64,
    reason: String,
    request_date: DateTime<Utc>,
    duration_months: i32,
    #[allow(dead_code)]
    status: LoanRequestStatus,
    president_approved: bool,
    president_approval_date: Option<DateTime<Utc>>,
    president_comment: Option<String>,
    secretary_approved: bool,
    secretary_approval_date: Option<DateTime<Utc>>,
    secretary_comment: Option<String>,
    treasurer_approved: bool,
    treasurer_approval_date: Option<DateTime<Utc>>,
    treasurer_comment: Option<String>,
    rejection_reason: Option<String>,
    rejected_by_role: Option<ApproverRole>,
    rejection_date: Option<DateTime<Utc>>,
}

impl From<LoanRequestRow> for LoanRequest {
    fn from(row: LoanRequestRow) -> Self {
        let rejection = match (row.rejection_reason, row.rejected_by_role, row.rejection_date) {
            (Some(reason), Some(rejected_by), Some(rejected_at)) => Some(Rejection {
                reason,
                rejected_by,
                rejected_at,
            }),
            _ => None,
        };

        let ledger = ApprovalLedger {
            president: RoleApproval {
                approved: row.president_approved,
                approval_date: row.president_approval_date,
                comment: row.president_comment,
            },
            secretary: RoleApproval {
                approved: row.secretary_approved,
                approval_date: row.secretary_approval_date,
                comment: row.secretary_comment,
            },
            treasurer: RoleApproval {
                approved: row.treasurer_approved,
                approval_date: row.treasurer_approval_date,
                comment: row.treasurer_comment,
            },
            rejection,
        };

        LoanRequest::restore(
            row.id,
            row.member_id,
            row.request_amount,
            row.reason,
            row.request_date,
            row.duration_months,
            ledger,
        )
    }
}

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn insert_member(&self, member: Member) -> Result<Member, StoreError> {
        let inserted = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (id, name, first_name, email, password_hash, role, npi, phone, created_at)
            VALUES ($1, $2, $3, LOWER($4), $5, $6, $7, $8, $9)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.first_name)
        .bind(&member.email)
        .bind(&member.password_hash)
        .bind(member.role)
        .bind(&member.npi)
        .bind(&member.phone)
        .bind(member.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, StoreError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE email = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn list_members(&self) -> Result<Vec<Member>, StoreError> {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn update_member_role(&self, id: Uuid, role: MemberRole) -> Result<Member, StoreError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET role = $1 WHERE id = $2 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(member)
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        let (revoked,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;
        Ok(revoked)
    }
}

#[async_trait]
impl LoanRequestStore for PgStore {
    async fn insert_request(&self, request: LoanRequest) -> Result<LoanRequest, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO loan_requests (
                id, member_id, request_amount, reason, request_date, duration_months, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(request.id)
        .bind(request.member_id)
        .bind(request.request_amount)
        .bind(&request.reason)
        .bind(request.request_date)
        .bind(request.duration_months)
        .bind(request.status())
        .execute(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<LoanRequest>, StoreError> {
        let row = sqlx::query_as::<_, LoanRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM loan_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LoanRequest::from))
    }

    async fn list_requests(
        &self,
        status: Option<LoanRequestStatus>,
        member_id: Option<Uuid>,
    ) -> Result<Vec<LoanRequest>, StoreError> {
        let rows = sqlx::query_as::<_, LoanRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM loan_requests
            WHERE ($1::loan_request_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR member_id = $2)
            ORDER BY request_date DESC, id ASC
            "#
        ))
        .bind(status)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LoanRequest::from).collect())
    }

    async fn mutate_request(
        &self,
        id: Uuid,
        mutation: RequestMutation<'_>,
    ) -> Result<(LoanRequest, LedgerChange), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock held until commit serializes concurrent approvals
        let row = sqlx::query_as::<_, LoanRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM loan_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let mut request = LoanRequest::from(row);
        let change = mutation(&mut request)?;

        if let LedgerChange::Unchanged = change {
            tx.rollback().await?;
            return Ok((request, change));
        }

        let ledger = request.ledger();
        let rejection = ledger.rejection();
        let president = ledger.slot(ApproverRole::President);
        let secretary = ledger.slot(ApproverRole::Secretary);
        let treasurer = ledger.slot(ApproverRole::Treasurer);

        sqlx::query(
            r#"
            UPDATE loan_requests SET
                status = $1,
                president_approved = $2, president_approval_date = $3, president_comment = $4,
                secretary_approved = $5, secretary_approval_date = $6, secretary_comment = $7,
                treasurer_approved = $8, treasurer_approval_date = $9, treasurer_comment = $10,
                rejection_reason = $11, rejected_by_role = $12, rejection_date = $13,
                updated_at = NOW()
            WHERE id = $14
            "#,
        )
        .bind(request.status())
        .bind(president.approved)
        .bind(president.approval_date)
        .bind(&president.comment)
        .bind(secretary.approved)
        .bind(secretary.approval_date)
        .bind(&secretary.comment)
        .bind(treasurer.approved)
        .bind(treasurer.approval_date)
        .bind(&treasurer.comment)
        .bind(rejection.map(|r| r.reason.clone()))
        .bind(rejection.map(|r| r.rejected_by))
        .bind(rejection.map(|r| r.rejected_at))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((request, change))
    }
}

#[async_trait]
impl LoanStore for PgStore {
    async fn insert_loan(&self, loan: Loan) -> Result<Loan, StoreError> {
        let inserted = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (
                id, loan_request_id, member_id, amount, begin_date, end_date,
                interest_rate_bps, repayment_amount, is_repaid, repaid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(loan.id)
        .bind(loan.loan_request_id)
        .bind(loan.member_id)
        .bind(loan.amount)
        .bind(loan.begin_date)
        .bind(loan.end_date)
        .bind(loan.interest_rate_bps)
        .bind(loan.repayment_amount)
        .bind(loan.is_repaid)
        .bind(loan.repaid_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn find_loan_by_request(
        &self,
        loan_request_id: Uuid,
    ) -> Result<Option<Loan>, StoreError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE loan_request_id = $1"
        ))
        .bind(loan_request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn list_loans(&self, member_id: Option<Uuid>) -> Result<Vec<Loan>, StoreError> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {LOAN_COLUMNS} FROM loans
            WHERE ($1::uuid IS NULL OR member_id = $1)
            ORDER BY begin_date DESC, id ASC
            "#
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn mark_loan_repaid(&self, id: Uuid, at: DateTime<Utc>) -> Result<Loan, StoreError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET is_repaid = TRUE, repaid_at = COALESCE(repaid_at, $1)
            WHERE id = $2
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(loan)
    }
}

impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
