//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::loan;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loan", get(loan::list_loans))
        .route("/loan/my-loans", get(loan::my_loans))
        .route("/loan/:id/repaid", post(loan::mark_repaid))
}
