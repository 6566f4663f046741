//! Loan request routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::loan_request;
use crate::state::AppState;

pub fn loan_request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/loan_request",
            get(loan_request::list_requests).post(loan_request::create_request),
        )
        .route("/loan_request/all", get(loan_request::list_requests))
        .route("/loan_request/my-requests", get(loan_request::my_requests))
        .route(
            "/loan_request/validator-stats",
            get(loan_request::validator_stats),
        )
        .route("/loan_request/stats", get(loan_request::status_counts))
        .route("/loan_request/:id", get(loan_request::get_request))
        .route(
            "/loan_request/:id/approve/:role",
            post(loan_request::approve_request),
        )
        .route("/loan_request/:id/reject", post(loan_request::reject_request))
        .route(
            "/loan_request/:id/disburse",
            post(loan_request::disburse_request),
        )
        .route(
            "/loan-validator/my-approval-history",
            get(loan_request::my_approval_history),
        )
}
