//! HTTP client for the Mutuelle API

use axum::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::session::Session;
use crate::error::ErrorResponse;
use crate::loan_request::{
    ApproverRole, CreateLoanRequest, LoanRequestView, RequestFilter, ValidatorStats,
};
use crate::models::{AuthTokensResponse, LoginRequest};

/// Client-side errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Not signed in or session expired")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Only transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout | ClientError::Network(_))
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            s if s.is_client_error() => ClientError::InvalidArgument(message),
            _ => ClientError::Server(message),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// Loan request operations the approval view needs
#[async_trait]
pub trait LoanRequestApi: Send + Sync {
    async fn list_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<LoanRequestView>, ClientError>;

    async fn approve(
        &self,
        id: Uuid,
        role: ApproverRole,
        comment: Option<String>,
    ) -> Result<LoanRequestView, ClientError>;

    async fn reject(
        &self,
        id: Uuid,
        reason: &str,
        role: ApproverRole,
    ) -> Result<LoanRequestView, ClientError>;
}

/// API client; every call carries the session's bearer token
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(
        base_url: impl Into<String>,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-success statuses. A 401 ends the session.
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorized(builder).await.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("Server rejected credentials, clearing session");
            self.session.logout().await;
        }

        Err(ClientError::from_status(status, message))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Log in and open the session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokensResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let tokens: AuthTokensResponse = self
            .send(self.http.post(self.url("/auth/login")).json(&body))
            .await?;
        self.session.login(tokens.clone()).await;
        Ok(tokens)
    }

    /// Revoke the token server side; the local session closes either way
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.execute(self.http.post(self.url("/auth/logout"))).await;
        self.session.logout().await;
        result.map(|_| ())
    }

    pub async fn my_requests(&self) -> Result<Vec<LoanRequestView>, ClientError> {
        self.send(self.http.get(self.url("/loan_request/my-requests")))
            .await
    }

    pub async fn create_request(
        &self,
        request: &CreateLoanRequest,
    ) -> Result<LoanRequestView, ClientError> {
        self.send(self.http.post(self.url("/loan_request")).json(request))
            .await
    }

    pub async fn get_request(&self, id: Uuid) -> Result<LoanRequestView, ClientError> {
        self.send(self.http.get(self.url(&format!("/loan_request/{}", id))))
            .await
    }

    pub async fn validator_stats(&self) -> Result<ValidatorStats, ClientError> {
        self.send(self.http.get(self.url("/loan_request/validator-stats")))
            .await
    }

    pub async fn approval_history(&self) -> Result<Vec<LoanRequestView>, ClientError> {
        self.send(
            self.http
                .get(self.url("/loan-validator/my-approval-history")),
        )
        .await
    }
}

#[async_trait]
impl LoanRequestApi for ApiClient {
    async fn list_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<LoanRequestView>, ClientError> {
        let mut builder = self.http.get(self.url("/loan_request/all"));
        if let Some(status) = filter.status() {
            builder = builder.query(&[("status", status.as_str())]);
        }
        self.send(builder).await
    }

    async fn approve(
        &self,
        id: Uuid,
        role: ApproverRole,
        comment: Option<String>,
    ) -> Result<LoanRequestView, ClientError> {
        let path = format!("/loan_request/{}/approve/{}", id, role.as_str());
        self.send(
            self.http
                .post(self.url(&path))
                .json(&json!({ "comment": comment })),
        )
        .await
    }

    async fn reject(
        &self,
        id: Uuid,
        reason: &str,
        role: ApproverRole,
    ) -> Result<LoanRequestView, ClientError> {
        let path = format!("/loan_request/{}/reject", id);
        self.send(self.http.post(self.url(&path)).json(&json!({
            "rejectionReason": reason,
            "rejectedByRole": role,
        })))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, "x".into()),
            ClientError::Unauthorized
        );
        assert_eq!(
            ClientError::from_status(StatusCode::FORBIDDEN, "no".into()),
            ClientError::Forbidden("no".into())
        );
        assert_eq!(
            ClientError::from_status(StatusCode::BAD_REQUEST, "bad".into()),
            ClientError::InvalidArgument("bad".into())
        );
        assert_eq!(
            ClientError::from_status(StatusCode::SERVICE_UNAVAILABLE, "down".into()),
            ClientError::Server("down".into())
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Network("reset".into()).is_retryable());
        assert!(!ClientError::Unauthorized.is_retryable());
        assert!(!ClientError::Forbidden("no".into()).is_retryable());
    }
}
