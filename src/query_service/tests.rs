use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::types::{QueryError, StorageError};
use crate::query_service::{QueryService, SummaryQuery};
use crate::storage::memory_storage::MemoryStorage;
use crate::storage::types::{AppSession, Application, NewApplication, Session, SessionFilter};
use crate::storage::Storage;
use crate::traffic_analysis::SessionTotal;

const MINUTE: i64 = 60_000;

fn sess(app: i64, start: i64, bytes_tx: u64, bytes_rx: u64) -> Session {
    Session {
        start,
        duration_sec: 60,
        application_id: app,
        bytes_tx,
        bytes_rx,
        pkt_tx: 10,
        pkt_rx: 5,
        pkt_tcp: 12,
        pkt_udp: 3,
    }
}

async fn service_with(apps: &[&str], sessions: Vec<Session>) -> QueryService {
    let _ = env_logger::builder().is_test(true).try_init();
    let storage = Arc::new(MemoryStorage::new());
    let batch: Vec<NewApplication> = apps.iter().map(|n| NewApplication::named(*n)).collect();
    storage.insert_applications(&batch).await.unwrap();
    storage.insert_sessions(&sessions).await.unwrap();
    QueryService::new(storage, Duration::from_secs(5))
}

fn window(start: i64, end: i64) -> (String, String) {
    (start.to_string(), end.to_string())
}

#[tokio::test]
async fn range_filter_is_half_open() {
    let service = service_with(
        &["browser"],
        vec![
            sess(1, 0, 1, 0),
            sess(1, 5 * MINUTE, 1, 0),
            sess(1, 10 * MINUTE, 1, 0),
            sess(1, 15 * MINUTE, 1, 0),
        ],
    )
    .await;
    let (start, end) = window(5 * MINUTE, 15 * MINUTE);
    let groups = service.get_data(Some(&start), Some(&end)).await.unwrap();
    let starts: Vec<i64> = groups[0].sessions.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![5 * MINUTE, 10 * MINUTE]);
}

#[tokio::test]
async fn applications_without_sessions_are_dropped() {
    let service = service_with(&["browser", "idle"], vec![sess(1, 0, 1, 0)]).await;
    let groups = service.get_data(Some("0"), Some("1000")).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].application.name, "browser");

    let apps = service.list_applications().await.unwrap();
    assert!(apps.iter().any(|a| a.name == "idle"));
}

#[tokio::test]
async fn bad_bounds_fail_before_storage() {
    let service = service_with(&[], vec![]).await;
    match service.get_data(None, Some("0")).await {
        Err(QueryError::Validation { field, .. }) => assert_eq!(field, "start"),
        other => panic!("unexpected {:?}", other),
    }
    match service.get_data(Some("0"), Some("not-a-date")).await {
        Err(QueryError::Validation { field, .. }) => assert_eq!(field, "end"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn browser_scenario_summary() {
    let service = service_with(
        &["browser"],
        vec![
            sess(1, 0, 100, 50),
            sess(1, 300_000, 200, 100),
            sess(1, 700_000, 400, 200),
        ],
    )
    .await;
    let query = SummaryQuery {
        start: Some("0".into()),
        end: Some("600000".into()),
        interval: Some("10m".into()),
        ..Default::default()
    };
    let summary = service.get_summary(&query).await.unwrap();
    assert_eq!(summary.data[0].sessions.len(), 2);
    assert_eq!(
        summary.total,
        SessionTotal {
            bytes_tx: 300,
            bytes_rx: 150,
            pkt_tx: 20,
            pkt_rx: 10,
            pkt_tcp: 24,
            pkt_udp: 6,
        }
    );
    // both sessions fall inside one 10 minute bucket
    assert_eq!(summary.intervals.labels, vec![0]);
    assert_eq!(summary.intervals.get("browser").unwrap(), &[450]);
    assert_eq!(summary.timeline, vec![0, 300_000]);
    assert_eq!(summary.udp[0].values, vec![3, 3]);
    assert_eq!(summary.application_bytes[0].value, 450);
    assert!(summary.colors["browser"].starts_with('#'));
    assert_eq!(
        summary.fill_colors["browser"],
        format!("{}80", summary.colors["browser"])
    );
    assert_eq!(summary.tx_human, "300.0 B");
    assert_eq!(summary.rx_human, "150.0 B");
}

#[tokio::test]
async fn summary_rate_uses_window_length() {
    let service = service_with(&["backup"], vec![sess(1, 0, 15_000, 5_000)]).await;
    let query = SummaryQuery {
        start: Some("0".into()),
        end: Some("10000".into()),
        ..Default::default()
    };
    let summary = service.get_summary(&query).await.unwrap();
    assert_eq!(summary.tx_human, "15.0 KB");
    assert_eq!(summary.rate_human, "2.0 KB/s");
}

#[tokio::test]
async fn summary_rejects_unknown_options() {
    let service = service_with(&[], vec![]).await;
    let query = SummaryQuery {
        start: Some("0".into()),
        end: Some("1".into()),
        unit: Some("parsecs".into()),
        ..Default::default()
    };
    match service.get_summary(&query).await {
        Err(QueryError::Validation { field, .. }) => assert_eq!(field, "unit"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn summary_unit_conversion() {
    let service = service_with(&["browser"], vec![sess(1, 0, 1_500, 500)]).await;
    let query = SummaryQuery {
        start: Some("0".into()),
        end: Some("1000".into()),
        unit: Some("KB".into()),
        ..Default::default()
    };
    let summary = service.get_summary(&query).await.unwrap();
    assert_eq!(summary.intervals_in_unit, vec![vec![2.0]]);
    assert_eq!(summary.intervals.get("browser").unwrap(), &[2_000]);
}

#[tokio::test]
async fn color_update_is_idempotent_and_checks_name() {
    let service = service_with(&["browser", "mail"], vec![]).await;
    service.set_application_color("mail", "#AABBCC").await.unwrap();
    let once = service.list_applications().await.unwrap();
    service.set_application_color("mail", "#AABBCC").await.unwrap();
    assert_eq!(service.list_applications().await.unwrap(), once);

    match service.set_application_color("ghost", "#AABBCC").await {
        Err(QueryError::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(service.list_applications().await.unwrap(), once);
}

#[tokio::test]
async fn color_must_be_hex_or_empty() {
    let service = service_with(&["browser"], vec![]).await;
    assert!(service.set_application_color("browser", "").await.is_ok());
    assert!(service.set_application_color("browser", "#11223344").await.is_ok());
    match service.set_application_color("browser", "red").await {
        Err(QueryError::Validation { field, .. }) => assert_eq!(field, "colorHex"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn batch_inserts_report_failed_indices() {
    let service = service_with(&["browser"], vec![]).await;
    let err = service
        .register_applications(&[NewApplication::named("mail"), NewApplication::named("browser")])
        .await
        .unwrap_err();
    match err {
        QueryError::Storage(e) => assert_eq!(e.failed_indices(), &[1]),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(service.list_applications().await.unwrap().len(), 1);

    match service.register_applications(&[NewApplication::named(" ")]).await {
        Err(QueryError::Validation { field, .. }) => assert_eq!(field, "name"),
        other => panic!("unexpected {:?}", other),
    }

    let err = service
        .record_sessions(&[sess(1, 0, 1, 1), sess(9, 0, 1, 1)])
        .await
        .unwrap_err();
    match err {
        QueryError::Storage(e) => assert_eq!(e.failed_indices(), &[1]),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn skewed_protocol_split_is_still_recorded() {
    let service = service_with(&["browser"], vec![]).await;
    let mut skewed = sess(1, 0, 1, 1);
    skewed.pkt_tcp = 1_000;
    service.record_sessions(&[skewed]).await.unwrap();
    let groups = service.get_data(Some("0"), Some("1")).await.unwrap();
    assert_eq!(groups[0].sessions[0].pkt_tcp, 1_000);
}

struct StalledStorage;

#[async_trait]
impl Storage for StalledStorage {
    async fn fetch_sessions(&self, _filter: &SessionFilter) -> Result<Vec<AppSession>, StorageError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(Vec::new())
    }
    async fn list_applications(&self) -> Result<Vec<Application>, StorageError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(Vec::new())
    }
    async fn update_application_color(&self, _name: &str, _color_hex: &str) -> Result<u64, StorageError> {
        Ok(1)
    }
    async fn insert_applications(&self, _batch: &[NewApplication]) -> Result<(), StorageError> {
        Ok(())
    }
    async fn insert_sessions(&self, _batch: &[Session]) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn slow_storage_times_out() {
    let service = QueryService::new(Arc::new(StalledStorage), Duration::from_millis(250));
    match service.get_data(Some("0"), Some("1")).await {
        Err(QueryError::Timeout(budget)) => assert_eq!(budget, Duration::from_millis(250)),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        service.list_applications().await,
        Err(QueryError::Timeout(_))
    ));
}
