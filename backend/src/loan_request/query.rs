//! Filtering, ordering and aggregate views over loan requests

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::model::{ApproverRole, LoanRequest, LoanRequestStatus};

/// Status filter accepted by the list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFilter {
    #[default]
    All,
    Status(LoanRequestStatus),
}

impl RequestFilter {
    pub fn matches(&self, request: &LoanRequest) -> bool {
        match self {
            RequestFilter::All => true,
            RequestFilter::Status(status) => request.status() == *status,
        }
    }

    pub fn status(&self) -> Option<LoanRequestStatus> {
        match self {
            RequestFilter::All => None,
            RequestFilter::Status(status) => Some(*status),
        }
    }
}

impl FromStr for RequestFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(RequestFilter::All);
        }
        s.parse::<LoanRequestStatus>().map(RequestFilter::Status)
    }
}

/// Newest first; requests created at the same instant fall back to id order
/// so the listing is stable across calls and storage backends.
pub fn by_request_date_desc(a: &LoanRequest, b: &LoanRequest) -> Ordering {
    b.request_date
        .cmp(&a.request_date)
        .then_with(|| a.id.cmp(&b.id))
}

/// Apply a filter and the listing order
pub fn filter_and_sort(mut requests: Vec<LoanRequest>, filter: RequestFilter) -> Vec<LoanRequest> {
    requests.retain(|r| filter.matches(r));
    requests.sort_by(by_request_date_desc);
    requests
}

/// Requests `role` has approved, most recent approval first
pub fn approval_history(requests: Vec<LoanRequest>, role: ApproverRole) -> Vec<LoanRequest> {
    let mut history: Vec<LoanRequest> = requests
        .into_iter()
        .filter(|r| r.ledger().slot(role).approval_date.is_some())
        .collect();

    history.sort_by(|a, b| {
        let a_date = a.ledger().slot(role).approval_date;
        let b_date = b.ledger().slot(role).approval_date;
        b_date.cmp(&a_date).then_with(|| a.id.cmp(&b.id))
    });
    history
}

/// Number of requests in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: u64,
    pub in_review: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total: u64,
}

impl StatusCounts {
    pub fn tally<'a>(requests: impl IntoIterator<Item = &'a LoanRequest>) -> Self {
        requests
            .into_iter()
            .fold(StatusCounts::default(), |mut counts, request| {
                match request.status() {
                    LoanRequestStatus::Pending => counts.pending += 1,
                    LoanRequestStatus::InReview => counts.in_review += 1,
                    LoanRequestStatus::Approved => counts.approved += 1,
                    LoanRequestStatus::Rejected => counts.rejected += 1,
                }
                counts.total += 1;
                counts
            })
    }
}

/// Summary shown on the validators' dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorStats {
    pub total_requests: u64,
    /// PENDING and IN_REVIEW: still waiting on a decision
    pub pending_requests: u64,
    pub approved_requests: u64,
    pub rejected_requests: u64,
}

impl From<StatusCounts> for ValidatorStats {
    fn from(counts: StatusCounts) -> Self {
        Self {
            total_requests: counts.total,
            pending_requests: counts.pending + counts.in_review,
            approved_requests: counts.approved,
            rejected_requests: counts.rejected,
        }
    }
}
