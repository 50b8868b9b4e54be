//! Storage subsystem
//!
//! This module provides the session store adapter: the abstraction over the
//! collector's tables and its implementations.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `types`: shared data types (applications, sessions, ranges).
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `memory_storage`: in-process implementation for tests and local runs.
//! - `session_filter`: helpers to build session queries.
//! - `db_entities`: SeaORM entity models for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod memory_storage;
pub mod session_filter;
pub mod storage_trait;
pub mod types;

pub use storage_trait::Storage;
