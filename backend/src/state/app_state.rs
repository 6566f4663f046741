//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::config::Config;
use crate::loan_request::ApprovalService;
use crate::loan_service::LoanService;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub approval_service: Arc<ApprovalService>,
    pub loan_service: Arc<LoanService>,
    pub store: Arc<dyn Store>,
    /// Present when running on PostgreSQL, for health checks
    pub db: Option<PgPool>,
}

impl AppState {
    /// Wire the services on top of one store
    pub fn new<S>(store: Arc<S>, db: Option<PgPool>, config: &Config) -> Self
    where
        S: Store + 'static,
    {
        let loan_service = LoanService::new(store.clone(), config.loan_interest_rate_bps);
        let approval_service = ApprovalService::new(store.clone(), loan_service.clone());
        let auth_service = AuthService::new(
            store.clone(),
            config.jwt_secret.clone(),
            config.jwt_access_token_ttl_seconds,
            config.bcrypt_cost,
            config.bootstrap_president_email.clone(),
        );

        Self {
            auth_service: Arc::new(auth_service),
            approval_service: Arc::new(approval_service),
            loan_service: Arc::new(loan_service),
            store,
            db,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ApprovalService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.approval_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}
