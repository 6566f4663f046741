//! Loan requests and their multi-role approval workflow
//!
//! A request needs the approval of the president, the secretary and the
//! treasurer. Any of them can reject it instead, which is final.

pub mod dto;
mod model;
pub mod query;
mod service;
mod status;

pub use dto::{ApproveBody, CreateLoanRequest, ListRequestsQuery, LoanRequestView, RejectBody};
pub use model::{
    ApprovalLedger, ApproverRole, LedgerChange, LedgerError, LoanRequest, LoanRequestStatus,
    Rejection, RoleApproval,
};
pub use query::{RequestFilter, StatusCounts, ValidatorStats};
pub use service::{Actor, ApprovalError, ApprovalService};
pub use status::{derive_status, ApprovalProgress, TOTAL_APPROVERS};
