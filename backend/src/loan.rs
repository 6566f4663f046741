//! Disbursed loans
use chrono::Months;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::loan_request::LoanRequest;

const BPS_DENOMINATOR: i128 = 10_000;

/// Loan created from an approved request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub loan_request_id: Uuid,
    pub member_id: Uuid,
    pub amount: i64,
    pub begin_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub interest_rate_bps: i32, // basis points
    pub repayment_amount: i64,
    pub is_repaid: bool,
    pub repaid_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Build the loan for an approved request, starting at `begin_date`
    pub fn disburse(request: &LoanRequest, interest_rate_bps: i32, begin_date: DateTime<Utc>) -> Self {
        let term = Months::new(request.duration_months.max(0) as u32);
        let end_date = begin_date.checked_add_months(term).unwrap_or(begin_date);

        Self {
            id: Uuid::new_v4(),
            loan_request_id: request.id,
            member_id: request.member_id,
            amount: request.request_amount,
            begin_date,
            end_date,
            interest_rate_bps,
            repayment_amount: repayment_amount(request.request_amount, interest_rate_bps),
            is_repaid: false,
            repaid_at: None,
        }
    }
}

/// `amount * (1 + rate)`, rounded down to the whole franc
pub fn repayment_amount(amount: i64, interest_rate_bps: i32) -> i64 {
    let total = amount as i128 * (BPS_DENOMINATOR + interest_rate_bps as i128) / BPS_DENOMINATOR;
    i64::try_from(total).unwrap_or(i64::MAX)
}
