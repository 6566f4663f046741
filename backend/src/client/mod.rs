//! Client side of the approval workflow
//!
//! A UI shell owns one [`Session`], builds an [`ApiClient`] on it and drives
//! an [`ApprovalController`] per approvals view.

mod api;
mod controller;
mod session;

pub use api::{ApiClient, ClientError, LoanRequestApi};
pub use controller::{ApprovalController, Navigator, RequestRow, RowState};
pub use session::Session;
