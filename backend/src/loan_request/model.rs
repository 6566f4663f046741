//! Loan request and its approval ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::status::{derive_status, ApprovalProgress};

/// Roles holding a vote in the approval ledger
#[derive(
    Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[sqlx(type_name = "approver_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApproverRole {
    President,
    Secretary,
    Treasurer,
}

impl ApproverRole {
    /// Every role whose approval is required, in display order
    pub const ALL: [ApproverRole; 3] = [
        ApproverRole::President,
        ApproverRole::Secretary,
        ApproverRole::Treasurer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApproverRole::President => "PRESIDENT",
            ApproverRole::Secretary => "SECRETARY",
            ApproverRole::Treasurer => "TREASURER",
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApproverRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRESIDENT" => Ok(ApproverRole::President),
            "SECRETARY" => Ok(ApproverRole::Secretary),
            "TREASURER" => Ok(ApproverRole::Treasurer),
            other => Err(format!("'{}' is not an approver role", other)),
        }
    }
}

/// Lifecycle status of a loan request, always derived from the ledger
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanRequestStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl LoanRequestStatus {
    pub const ALL: [LoanRequestStatus; 4] = [
        LoanRequestStatus::Pending,
        LoanRequestStatus::InReview,
        LoanRequestStatus::Approved,
        LoanRequestStatus::Rejected,
    ];

    /// APPROVED and REJECTED accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanRequestStatus::Approved | LoanRequestStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanRequestStatus::Pending => "PENDING",
            LoanRequestStatus::InReview => "IN_REVIEW",
            LoanRequestStatus::Approved => "APPROVED",
            LoanRequestStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for LoanRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(LoanRequestStatus::Pending),
            "IN_REVIEW" => Ok(LoanRequestStatus::InReview),
            "APPROVED" => Ok(LoanRequestStatus::Approved),
            "REJECTED" => Ok(LoanRequestStatus::Rejected),
            other => Err(format!("unknown loan request status '{}'", other)),
        }
    }
}

/// Errors raised by ledger operations themselves
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Loan request is {0} and can no longer be modified")]
    Terminal(LoanRequestStatus),

    #[error("A rejection reason is required")]
    MissingReason,
}

/// Outcome of a ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Applied {
        from: LoanRequestStatus,
        to: LoanRequestStatus,
    },
    /// Idempotent repeat; nothing was written
    Unchanged,
}

impl LedgerChange {
    /// True when this change moved the request into APPROVED
    pub fn completed_approval(&self) -> bool {
        matches!(
            self,
            LedgerChange::Applied { from, to: LoanRequestStatus::Approved }
                if *from != LoanRequestStatus::Approved
        )
    }
}

/// One approver's slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleApproval {
    pub approved: bool,
    pub approval_date: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Terminal rejection record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    pub rejected_by: ApproverRole,
    pub rejected_at: DateTime<Utc>,
}

/// Per-request record of approvals and rejection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalLedger {
    pub(crate) president: RoleApproval,
    pub(crate) secretary: RoleApproval,
    pub(crate) treasurer: RoleApproval,
    pub(crate) rejection: Option<Rejection>,
}

impl ApprovalLedger {
    pub fn slot(&self, role: ApproverRole) -> &RoleApproval {
        match role {
            ApproverRole::President => &self.president,
            ApproverRole::Secretary => &self.secretary,
            ApproverRole::Treasurer => &self.treasurer,
        }
    }

    fn slot_mut(&mut self, role: ApproverRole) -> &mut RoleApproval {
        match role {
            ApproverRole::President => &mut self.president,
            ApproverRole::Secretary => &mut self.secretary,
            ApproverRole::Treasurer => &mut self.treasurer,
        }
    }

    pub fn is_approved_by(&self, role: ApproverRole) -> bool {
        self.slot(role).approved
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub fn status(&self) -> LoanRequestStatus {
        derive_status(self)
    }

    pub fn progress(&self) -> ApprovalProgress {
        ApprovalProgress::of(self)
    }
}

/// A member's request for funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRequest {
    pub id: Uuid,
    pub member_id: Uuid,
    /// Whole XOF, always positive
    pub request_amount: i64,
    pub reason: String,
    pub request_date: DateTime<Utc>,
    pub duration_months: i32,
    status: LoanRequestStatus,
    ledger: ApprovalLedger,
}

impl LoanRequest {
    /// New PENDING request with an empty ledger
    pub fn new(
        member_id: Uuid,
        request_amount: i64,
        reason: String,
        duration_months: i32,
        request_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            request_amount,
            reason,
            request_date,
            duration_months,
            status: LoanRequestStatus::Pending,
            ledger: ApprovalLedger::default(),
        }
    }

    /// Rebuild a request read back from storage. The status is re-derived
    /// from the ledger rather than trusted.
    pub(crate) fn restore(
        id: Uuid,
        member_id: Uuid,
        request_amount: i64,
        reason: String,
        request_date: DateTime<Utc>,
        duration_months: i32,
        ledger: ApprovalLedger,
    ) -> Self {
        let status = derive_status(&ledger);
        Self {
            id,
            member_id,
            request_amount,
            reason,
            request_date,
            duration_months,
            status,
            ledger,
        }
    }

    pub fn status(&self) -> LoanRequestStatus {
        self.status
    }

    pub fn ledger(&self) -> &ApprovalLedger {
        &self.ledger
    }

    pub fn progress(&self) -> ApprovalProgress {
        self.ledger.progress()
    }

    /// Record `role`'s approval. A repeat approval by the same role leaves the
    /// original date and comment in place.
    pub fn approve(
        &mut self,
        role: ApproverRole,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LedgerChange, LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::Terminal(self.status));
        }

        let slot = self.ledger.slot_mut(role);
        if slot.approved {
            return Ok(LedgerChange::Unchanged);
        }

        slot.approved = true;
        slot.approval_date = Some(now);
        slot.comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(self.rederive())
    }

    /// Reject the request. Terminal: approvals recorded so far are frozen.
    pub fn reject(
        &mut self,
        role: ApproverRole,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerChange, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::MissingReason);
        }
        if self.status.is_terminal() {
            return Err(LedgerError::Terminal(self.status));
        }

        self.ledger.rejection = Some(Rejection {
            reason: reason.to_string(),
            rejected_by: role,
            rejected_at: now,
        });

        Ok(self.rederive())
    }

    fn rederive(&mut self) -> LedgerChange {
        let from = self.status;
        self.status = derive_status(&self.ledger);
        LedgerChange::Applied {
            from,
            to: self.status,
        }
    }
}
