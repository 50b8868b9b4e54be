use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

use crate::error_handling::types::StorageError;
use crate::storage::db_entities::{application, session};
use crate::storage::storage_trait::Storage;
use crate::storage::types::{AppSession, Application, NewApplication, Session, SessionFilter};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS Application (
        id       INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        name     TEXT UNIQUE NOT NULL,
        colorHex TEXT DEFAULT ''
    );",
    "CREATE TABLE IF NOT EXISTS Session (
        start         INT NOT NULL,
        durationSec   INT NOT NULL,
        applicationId INT NOT NULL REFERENCES Application(id),
        bytesTx       INT NOT NULL,
        bytesRx       INT NOT NULL,
        pktTx         INT NOT NULL,
        pktRx         INT NOT NULL,
        pktTcp        INT NOT NULL,
        pktUdp        INT NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS SessionApplicationStart ON Session (applicationId, start);",
];

fn counter(field: &str, value: i64) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|e| StorageError::read(format!("negative `{}` in session row", field), e))
}

impl session::Model {
    fn into_session(self) -> Result<Session, StorageError> {
        Ok(Session {
            start: self.start,
            duration_sec: counter("durationSec", self.duration_sec)?,
            application_id: self.application_id,
            bytes_tx: counter("bytesTx", self.bytes_tx)?,
            bytes_rx: counter("bytesRx", self.bytes_rx)?,
            pkt_tx: counter("pktTx", self.pkt_tx)?,
            pkt_rx: counter("pktRx", self.pkt_rx)?,
            pkt_tcp: counter("pktTcp", self.pkt_tcp)?,
            pkt_udp: counter("pktUdp", self.pkt_udp)?,
        })
    }
}

impl From<application::Model> for Application {
    fn from(model: application::Model) -> Self {
        Application {
            id: model.id,
            name: model.name,
            color_hex: model.color_hex.unwrap_or_default(),
        }
    }
}

fn to_active_session(s: &Session) -> Option<session::ActiveModel> {
    let column = |v: u64| i64::try_from(v).ok();
    Some(session::ActiveModel {
        id: NotSet,
        start: Set(s.start),
        duration_sec: Set(column(s.duration_sec)?),
        application_id: Set(s.application_id),
        bytes_tx: Set(column(s.bytes_tx)?),
        bytes_rx: Set(column(s.bytes_rx)?),
        pkt_tx: Set(column(s.pkt_tx)?),
        pkt_rx: Set(column(s.pkt_rx)?),
        pkt_tcp: Set(column(s.pkt_tcp)?),
        pkt_udp: Set(column(s.pkt_udp)?),
    })
}

/// SQLite-backed storage shared with the collector process.
pub struct DatabaseStorage {
    db: DatabaseConnection,
}

impl DatabaseStorage {
    /// Open the database file at `path`, creating it and the schema if missing.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::write(format!("creating {}", parent.display()), e)
            })?;
        }
        let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
        opts.max_connections(5).sqlx_logging(false);
        let db = Database::connect(opts).await.map_err(|e| {
            StorageError::connection(format!("opening {}", path.display()), e)
        })?;
        info!("Opened session database at {}", path.display());
        Self::with_connection(db).await
    }

    /// Wrap an existing connection, applying the schema if it is absent.
    ///
    /// sqlx turns `foreign_keys` on for every pooled SQLite connection, so
    /// sessions pointing at unknown applications are rejected by the engine.
    pub async fn with_connection(db: DatabaseConnection) -> Result<Self, StorageError> {
        for statement in SCHEMA {
            db.execute_unprepared(statement)
                .await
                .map_err(|e| StorageError::write("creating schema", e))?;
        }
        Ok(Self { db })
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn fetch_sessions(&self, filter: &SessionFilter) -> Result<Vec<AppSession>, StorageError> {
        // One transaction so both reads see the same snapshot.
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StorageError::read("starting read snapshot", e))?;

        let mut apps = application::Entity::find().order_by_asc(application::Column::Id);
        if let Some(name) = &filter.application {
            apps = apps.filter(application::Column::Name.eq(name.as_str()));
        }
        let apps = apps
            .all(&txn)
            .await
            .map_err(|e| StorageError::read("loading applications", e))?;

        let mut rows = session::Entity::find()
            .filter(session::Column::Start.gte(filter.range.start))
            .filter(session::Column::Start.lt(filter.range.end));
        if filter.application.is_some() {
            rows = rows.filter(session::Column::ApplicationId.is_in(apps.iter().map(|a| a.id)));
        }
        let rows = rows
            .order_by_asc(session::Column::ApplicationId)
            .order_by_asc(session::Column::Start)
            .order_by_asc(session::Column::Id)
            .all(&txn)
            .await
            .map_err(|e| StorageError::read("loading sessions", e))?;

        txn.commit()
            .await
            .map_err(|e| StorageError::read("closing read snapshot", e))?;

        debug!(
            "Fetched {} session rows in [{}, {})",
            rows.len(),
            filter.range.start,
            filter.range.end
        );

        let mut by_app: HashMap<i64, Vec<Session>> = HashMap::new();
        for row in rows {
            let s = row.into_session()?;
            by_app.entry(s.application_id).or_default().push(s);
        }

        let mut out = Vec::with_capacity(by_app.len());
        for app in apps {
            if let Some(sessions) = by_app.remove(&app.id) {
                out.push(AppSession {
                    application: app.into(),
                    sessions,
                });
            }
        }
        Ok(out)
    }

    async fn list_applications(&self) -> Result<Vec<Application>, StorageError> {
        let apps = application::Entity::find()
            .order_by_asc(application::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| StorageError::read("loading applications", e))?;
        Ok(apps.into_iter().map(Application::from).collect())
    }

    async fn update_application_color(&self, name: &str, color_hex: &str) -> Result<u64, StorageError> {
        let res = application::Entity::update_many()
            .col_expr(application::Column::ColorHex, Expr::value(color_hex.to_owned()))
            .filter(application::Column::Name.eq(name))
            .exec(&self.db)
            .await
            .map_err(|e| StorageError::write(format!("updating color of {}", name), e))?;
        Ok(res.rows_affected)
    }

    async fn insert_applications(&self, batch: &[NewApplication]) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StorageError::write("starting application batch", e))?;
        let mut failed = Vec::new();
        let mut cause = None;
        for (index, app) in batch.iter().enumerate() {
            let model = application::ActiveModel {
                id: NotSet,
                name: Set(app.name.clone()),
                color_hex: Set(Some(app.color_hex.clone())),
            };
            if let Err(e) = application::Entity::insert(model).exec_without_returning(&txn).await {
                warn!("Application {} ({}) rejected: {}", index, app.name, e);
                failed.push(index);
                cause.get_or_insert_with(|| e.to_string());
            }
        }
        finish_batch(txn, "application", failed, cause).await
    }

    async fn insert_sessions(&self, batch: &[Session]) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StorageError::write("starting session batch", e))?;
        let mut failed = Vec::new();
        let mut cause = None;
        for (index, s) in batch.iter().enumerate() {
            let Some(model) = to_active_session(s) else {
                warn!("Session {} rejected: counter exceeds the 64-bit signed range", index);
                failed.push(index);
                cause.get_or_insert_with(|| "counter out of range".to_string());
                continue;
            };
            if let Err(e) = session::Entity::insert(model).exec_without_returning(&txn).await {
                warn!("Session {} rejected: {}", index, e);
                failed.push(index);
                cause.get_or_insert_with(|| e.to_string());
            }
        }
        finish_batch(txn, "session", failed, cause).await
    }
}

async fn finish_batch(
    txn: sea_orm::DatabaseTransaction,
    what: &str,
    failed: Vec<usize>,
    cause: Option<String>,
) -> Result<(), StorageError> {
    if failed.is_empty() {
        return txn
            .commit()
            .await
            .map_err(|e| StorageError::write(format!("committing {} batch", what), e));
    }
    txn.rollback()
        .await
        .map_err(|e| StorageError::write(format!("rolling back {} batch", what), e))?;
    Err(StorageError::batch_rejected(what, failed, cause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::StorageErrorKind;
    use crate::storage::session_filter::in_range;
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn temp_db() -> DatabaseStorage {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("test.sqlite3");
        // Keep TempDir alive by leaking it for the test duration
        Box::leak(Box::new(dir));
        DatabaseStorage::open(path).await.unwrap()
    }

    fn sess(app: i64, start: i64, bytes_tx: u64) -> Session {
        Session {
            start,
            duration_sec: 60,
            application_id: app,
            bytes_tx,
            bytes_rx: bytes_tx / 2,
            pkt_tx: 10,
            pkt_rx: 5,
            pkt_tcp: 12,
            pkt_udp: 3,
        }
    }

    async fn seeded() -> DatabaseStorage {
        let storage = temp_db().await;
        storage
            .insert_applications(&[
                NewApplication::named("browser"),
                NewApplication::named("mail"),
                NewApplication::named("idle"),
            ])
            .await
            .unwrap();
        storage
            .insert_sessions(&[
                sess(1, 10_000, 1),
                sess(1, 0, 2),
                sess(2, 5_000, 3),
                sess(1, 15_000, 4),
                sess(2, 20_000, 5),
            ])
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_db_range_is_half_open_and_sorted() {
        let storage = seeded().await;
        let groups = storage.fetch_sessions(&in_range(0, 15_000)).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].application.name, "browser");
        let starts: Vec<i64> = groups[0].sessions.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 10_000]);
        assert_eq!(groups[1].sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_db_drops_empty_groups() {
        let storage = seeded().await;
        let groups = storage.fetch_sessions(&in_range(16_000, 30_000)).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].application.name, "mail");
        assert_eq!(storage.list_applications().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_db_application_filter() {
        let storage = seeded().await;
        let groups = storage
            .fetch_sessions(&in_range(0, 30_000).for_application("mail"))
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].sessions.iter().all(|s| s.application_id == 2));
        let none = storage
            .fetch_sessions(&in_range(0, 30_000).for_application("unknown"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_db_color_update() {
        let storage = seeded().await;
        assert_eq!(storage.update_application_color("mail", "#112233").await.unwrap(), 1);
        assert_eq!(storage.update_application_color("nobody", "#112233").await.unwrap(), 0);
        let apps = storage.list_applications().await.unwrap();
        assert_eq!(apps[1].color_hex, "#112233");
        assert_eq!(apps[0].color_hex, "");
    }

    #[tokio::test]
    async fn test_db_application_batch_is_atomic() {
        let storage = seeded().await;
        let err = storage
            .insert_applications(&[
                NewApplication::named("editor"),
                NewApplication::named("browser"),
                NewApplication::named("shell"),
                NewApplication::named("shell"),
            ])
            .await
            .unwrap_err();
        assert_eq!(
            err.kind,
            StorageErrorKind::BatchRejected { failed: vec![1, 3] }
        );
        let names: Vec<String> = storage
            .list_applications()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["browser", "mail", "idle"]);
    }

    #[tokio::test]
    async fn test_db_session_batch_rejects_unknown_application() {
        let storage = seeded().await;
        let err = storage
            .insert_sessions(&[sess(1, 40_000, 1), sess(42, 40_000, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.failed_indices(), &[1]);
        let groups = storage.fetch_sessions(&in_range(40_000, 50_000)).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_db_reopen_keeps_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("omnis.db");
        {
            let storage = DatabaseStorage::open(&path).await.unwrap();
            storage.insert_applications(&[NewApplication::named("browser")]).await.unwrap();
            storage.insert_sessions(&[sess(1, 1_000, 7)]).await.unwrap();
        }
        let storage = DatabaseStorage::open(&path).await.unwrap();
        let groups = storage.fetch_sessions(&in_range(0, 2_000)).await.unwrap();
        assert_eq!(groups[0].sessions[0].bytes_tx, 7);
    }
}
