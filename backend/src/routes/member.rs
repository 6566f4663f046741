//! Member directory routes

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::member;
use crate::state::AppState;

pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/members", get(member::list_members))
        .route("/members/:id/role", put(member::assign_role))
}
