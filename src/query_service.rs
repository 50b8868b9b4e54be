//! Query service
//!
//! Orchestrates the store adapter and the traffic analysis functions behind
//! the operations the HTTP layer exposes. Input validation happens here,
//! before any storage call.

pub mod service;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use service::{DashboardSummary, QueryService, SummaryQuery};
