//! Mutuelle backend library
//!
//! Loan requests, their three-office approval workflow, the REST API that
//! exposes them and the client-side controller that drives it.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod loan_request;
pub mod loan_service;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
