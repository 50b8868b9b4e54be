//! Storage Trait
//!
//! This module defines the `Storage` trait, the boundary between the query
//! layer and whatever holds the collector's rows.
//!
//! Implementors of this trait are responsible for:
//! - Returning the sessions of a half-open time window grouped per application
//! - Listing applications and updating their display color
//! - Bulk inserting applications and sessions on behalf of the collector
//!
//! These are the only suspension points of a query; everything downstream
//! operates on the fetched rows in memory.

use async_trait::async_trait;

use crate::error_handling::types::StorageError;
use crate::storage::types::{AppSession, Application, NewApplication, Session, SessionFilter};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Sessions with `range.start <= start < range.end`, grouped by owning
    /// application in id order, each group sorted ascending by `start`.
    /// Applications without matching sessions are not returned.
    ///
    /// Both tables are read from one consistent snapshot.
    async fn fetch_sessions(&self, filter: &SessionFilter) -> Result<Vec<AppSession>, StorageError>;

    /// Every known application.
    async fn list_applications(&self) -> Result<Vec<Application>, StorageError>;

    /// Sets `colorHex` on the application called `name`, returns the number of
    /// rows touched (0 when no application has that name).
    async fn update_application_color(&self, name: &str, color_hex: &str) -> Result<u64, StorageError>;

    /// All-or-nothing insert. On failure nothing is written and the error
    /// lists every rejected index.
    async fn insert_applications(&self, batch: &[NewApplication]) -> Result<(), StorageError>;

    /// All-or-nothing insert, same contract as `insert_applications`.
    async fn insert_sessions(&self, batch: &[Session]) -> Result<(), StorageError>;
}
