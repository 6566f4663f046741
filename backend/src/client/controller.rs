//! Approval view controller
//!
//! Holds the rows of the approvals screen. An approval is shown immediately as
//! a pending local patch, then the list is refetched and the server's rows
//! replace the local ones.
//!
//! While a call to the server is outstanding the controller reports itself as
//! loading. A view that renders concurrently with the call follows that state
//! through [`ApprovalController::loading`].

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::api::{ClientError, LoanRequestApi};
use super::session::Session;
use crate::loan_request::{
    ApproverRole, LoanRequestStatus, LoanRequestView, RequestFilter, TOTAL_APPROVERS,
};

/// Whether a row reflects the server or an unconfirmed local patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestRow {
    pub request: LoanRequestView,
    pub state: RowState,
}

/// Sends the user to the login screen
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

pub struct ApprovalController {
    api: Arc<dyn LoanRequestApi>,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
    rows: Vec<RequestRow>,
    filter: RequestFilter,
    loading: watch::Sender<bool>,
    notice: Option<String>,
}

impl ApprovalController {
    pub fn new(
        api: Arc<dyn LoanRequestApi>,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            session,
            navigator,
            rows: Vec::new(),
            filter: RequestFilter::All,
            loading: watch::channel(false).0,
            notice: None,
        }
    }

    pub fn rows(&self) -> &[RequestRow] {
        &self.rows
    }

    pub fn filter(&self) -> RequestFilter {
        self.filter
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Follows the loading flag across awaits, for views that render while an
    /// operation is in flight
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub async fn set_filter(&mut self, filter: RequestFilter) -> Result<(), ClientError> {
        self.filter = filter;
        self.refresh().await
    }

    /// Reload the rows for the current filter
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.loading.send_replace(true);
        let result = self.fetch().await;
        self.loading.send_replace(false);

        if let Err(e) = &result {
            self.handle_error(e).await;
        }
        result
    }

    /// Approve as `role`. On success the row is patched locally, then
    /// replaced by a fresh listing; if that listing fails the patched rows
    /// stay on screen.
    pub async fn approve(
        &mut self,
        id: Uuid,
        role: ApproverRole,
        comment: Option<String>,
    ) -> Result<(), ClientError> {
        self.loading.send_replace(true);
        if let Err(e) = self.api.approve(id, role, comment.clone()).await {
            self.loading.send_replace(false);
            self.handle_error(&e).await;
            return Err(e);
        }

        self.apply_approval(id, role, comment);
        self.reconcile().await;
        self.loading.send_replace(false);
        Ok(())
    }

    /// Reject as `role`; the list is refetched, nothing is patched locally
    pub async fn reject(
        &mut self,
        id: Uuid,
        reason: &str,
        role: ApproverRole,
    ) -> Result<(), ClientError> {
        self.loading.send_replace(true);
        if let Err(e) = self.api.reject(id, reason, role).await {
            self.loading.send_replace(false);
            self.handle_error(&e).await;
            return Err(e);
        }

        self.reconcile().await;
        self.loading.send_replace(false);
        Ok(())
    }

    async fn fetch(&mut self) -> Result<(), ClientError> {
        let requests = self.api.list_requests(self.filter).await?;
        self.rows = requests
            .into_iter()
            .map(|request| RequestRow {
                request,
                state: RowState::Confirmed,
            })
            .collect();
        Ok(())
    }

    async fn reconcile(&mut self) {
        if let Err(e) = self.fetch().await {
            tracing::warn!(error = %e, "Refetch after mutation failed, keeping local rows");
            if e == ClientError::Unauthorized {
                self.handle_error(&e).await;
            }
        }
    }

    fn apply_approval(&mut self, id: Uuid, role: ApproverRole, comment: Option<String>) {
        let Some(row) = self.rows.iter_mut().find(|r| r.request.id == id) else {
            return;
        };
        let view = &mut row.request;
        if view.is_approved_by(role) {
            return;
        }

        let now = Utc::now();
        let (approved, date, slot_comment) = match role {
            ApproverRole::President => (
                &mut view.president_approved,
                &mut view.president_approval_date,
                &mut view.president_comment,
            ),
            ApproverRole::Secretary => (
                &mut view.secretary_approved,
                &mut view.secretary_approval_date,
                &mut view.secretary_comment,
            ),
            ApproverRole::Treasurer => (
                &mut view.treasurer_approved,
                &mut view.treasurer_approval_date,
                &mut view.treasurer_comment,
            ),
        };
        *approved = true;
        *date = Some(now);
        *slot_comment = comment.filter(|c| !c.trim().is_empty());

        let count = ApproverRole::ALL
            .iter()
            .filter(|r| view.is_approved_by(**r))
            .count() as u32;
        view.approved_count = count;
        view.approval_percentage = count * 100 / TOTAL_APPROVERS;
        view.status = if count == TOTAL_APPROVERS {
            LoanRequestStatus::Approved
        } else {
            LoanRequestStatus::InReview
        };
        row.state = RowState::Pending;
    }

    async fn handle_error(&mut self, error: &ClientError) {
        match error {
            ClientError::Unauthorized => {
                self.session.logout().await;
                self.rows.clear();
                self.navigator.to_login();
            }
            ClientError::Forbidden(message) => {
                self.notice = Some(message.clone());
            }
            other => {
                self.notice = Some(other.to_string());
            }
        }
    }
}
