use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};

use crate::error_handling::types::{StorageError, StorageErrorKind};
use crate::storage::storage_trait::Storage;
use crate::storage::types::{AppSession, Application, NewApplication, Session, SessionFilter};

#[derive(Default)]
struct Tables {
    applications: Vec<Application>,
    sessions: Vec<Session>,
}

/// In-process storage with the same contract as `DatabaseStorage`.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables.lock().map_err(|e| {
            StorageError::new(StorageErrorKind::ConnectionFailed, "memory tables poisoned")
                .with_cause(e)
        })
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn fetch_sessions(&self, filter: &SessionFilter) -> Result<Vec<AppSession>, StorageError> {
        let tables = self.lock()?;
        let mut out = Vec::new();
        for app in tables.applications.iter().filter(|a| filter.matches_application(&a.name)) {
            let mut sessions: Vec<Session> = tables
                .sessions
                .iter()
                .filter(|s| s.application_id == app.id && filter.range.contains(s.start))
                .cloned()
                .collect();
            if sessions.is_empty() {
                continue;
            }
            // stable, so equal starts keep insertion order like rowid does
            sessions.sort_by_key(|s| s.start);
            out.push(AppSession {
                application: app.clone(),
                sessions,
            });
        }
        debug!("Fetched {} application groups from memory", out.len());
        Ok(out)
    }

    async fn list_applications(&self) -> Result<Vec<Application>, StorageError> {
        Ok(self.lock()?.applications.clone())
    }

    async fn update_application_color(&self, name: &str, color_hex: &str) -> Result<u64, StorageError> {
        let mut tables = self.lock()?;
        let mut touched = 0;
        for app in tables.applications.iter_mut().filter(|a| a.name == name) {
            app.color_hex = color_hex.to_string();
            touched += 1;
        }
        Ok(touched)
    }

    async fn insert_applications(&self, batch: &[NewApplication]) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        let mut names: HashSet<&str> = tables.applications.iter().map(|a| a.name.as_str()).collect();
        let mut failed = Vec::new();
        for (index, app) in batch.iter().enumerate() {
            if !names.insert(app.name.as_str()) {
                warn!("Application {} ({}) rejected: name already exists", index, app.name);
                failed.push(index);
            }
        }
        if !failed.is_empty() {
            return Err(StorageError::batch_rejected(
                "application",
                failed,
                Some("UNIQUE constraint failed: Application.name".to_string()),
            ));
        }
        let mut next_id = tables.applications.iter().map(|a| a.id).max().unwrap_or(0);
        for app in batch {
            next_id += 1;
            tables.applications.push(Application {
                id: next_id,
                name: app.name.clone(),
                color_hex: app.color_hex.clone(),
            });
        }
        Ok(())
    }

    async fn insert_sessions(&self, batch: &[Session]) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        let known: HashSet<i64> = tables.applications.iter().map(|a| a.id).collect();
        let failed: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, s)| !known.contains(&s.application_id))
            .map(|(index, _)| index)
            .collect();
        if !failed.is_empty() {
            warn!("Session batch rejected, unknown applications at {:?}", failed);
            return Err(StorageError::batch_rejected(
                "session",
                failed,
                Some("FOREIGN KEY constraint failed".to_string()),
            ));
        }
        tables.sessions.extend_from_slice(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::session_filter::in_range;

    fn sess(app: i64, start: i64) -> Session {
        Session {
            start,
            application_id: app,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn filters_sorts_and_drops_empty_groups() {
        let storage = MemoryStorage::new();
        storage
            .insert_applications(&[NewApplication::named("a"), NewApplication::named("b")])
            .await
            .unwrap();
        storage
            .insert_sessions(&[sess(1, 900), sess(1, 100), sess(2, 5_000)])
            .await
            .unwrap();

        let groups = storage.fetch_sessions(&in_range(0, 1_000)).await.unwrap();
        assert_eq!(groups.len(), 1);
        let starts: Vec<i64> = groups[0].sessions.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![100, 900]);
    }

    #[tokio::test]
    async fn batches_are_all_or_nothing() {
        let storage = MemoryStorage::new();
        storage.insert_applications(&[NewApplication::named("a")]).await.unwrap();

        let err = storage
            .insert_applications(&[NewApplication::named("b"), NewApplication::named("a")])
            .await
            .unwrap_err();
        assert_eq!(err.failed_indices(), &[1]);
        assert_eq!(storage.list_applications().await.unwrap().len(), 1);

        let err = storage
            .insert_sessions(&[sess(1, 0), sess(7, 0), sess(8, 0)])
            .await
            .unwrap_err();
        assert_eq!(err.failed_indices(), &[1, 2]);
        assert!(storage.fetch_sessions(&in_range(0, 1)).await.unwrap().is_empty());
    }
}
