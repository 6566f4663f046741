//! Status derivation and approval progress

use serde::{Deserialize, Serialize};

use super::model::{ApprovalLedger, ApproverRole, LoanRequestStatus};

/// Number of votes a request needs. Fixed at the three office holders.
pub const TOTAL_APPROVERS: u32 = ApproverRole::ALL.len() as u32;

/// Map a ledger to its lifecycle status.
///
/// A rejection dominates everything; otherwise the status follows the number
/// of approvals recorded.
pub fn derive_status(ledger: &ApprovalLedger) -> LoanRequestStatus {
    if ledger.rejection().is_some() {
        return LoanRequestStatus::Rejected;
    }

    match approved_count(ledger) {
        n if n == TOTAL_APPROVERS => LoanRequestStatus::Approved,
        0 => LoanRequestStatus::Pending,
        _ => LoanRequestStatus::InReview,
    }
}

fn approved_count(ledger: &ApprovalLedger) -> u32 {
    ApproverRole::ALL
        .iter()
        .filter(|role| ledger.is_approved_by(**role))
        .count() as u32
}

/// Approval progress shown alongside a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalProgress {
    pub approved_count: u32,
    pub total_approvers: u32,
    /// Rounded down: 0, 33, 66, 100
    pub approval_percentage: u32,
}

impl ApprovalProgress {
    pub fn of(ledger: &ApprovalLedger) -> Self {
        let approved_count = approved_count(ledger);
        Self {
            approved_count,
            total_approvers: TOTAL_APPROVERS,
            approval_percentage: approved_count * 100 / TOTAL_APPROVERS,
        }
    }
}
