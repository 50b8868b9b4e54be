use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error_handling::types::{QueryError, StorageError};
use crate::storage::session_filter::in_range;
use crate::storage::types::{AppSession, Application, NewApplication, Session, TimeRange, Timestamp};
use crate::storage::Storage;
use crate::traffic_analysis::{
    aggregate, application_totals, bucket, palette, sample_at, timeline, units, ApplicationSeries,
    ApplicationTotal, BucketInterval, ByteUnit, Containment, IntervalSeries, Metric, SampleField,
    SessionTotal,
};

/// Opacity of chart fills behind the solid application colors.
const FILL_OPACITY: f64 = 0.5;

const COLOR_PATTERN: &str = r"^#[0-9A-Fa-f]{6}([0-9A-Fa-f]{2})?$";

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(COLOR_PATTERN).expect("color pattern is a valid regex"))
}

/// Raw dashboard parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub interval: Option<String>,
    pub metric: Option<String>,
    pub unit: Option<String>,
    pub containment: Option<String>,
}

/// Everything one dashboard poll renders, computed from a single fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub range: TimeRange,
    pub data: Vec<AppSession>,
    pub total: SessionTotal,
    /// Human readable `total.bytes_tx` / `total.bytes_rx`, e.g. `1.5 KB`.
    pub tx_human: String,
    pub rx_human: String,
    /// Average throughput over the window, e.g. `2.0 KB/s`.
    pub rate_human: String,
    pub colors: BTreeMap<String, String>,
    pub fill_colors: BTreeMap<String, String>,
    pub application_bytes: Vec<ApplicationTotal>,
    pub application_packets: Vec<ApplicationTotal>,
    pub application_protocol_packets: Vec<ApplicationTotal>,
    pub interval: BucketInterval,
    pub unit: ByteUnit,
    pub intervals: IntervalSeries,
    pub intervals_in_unit: Vec<Vec<f64>>,
    pub timeline: Vec<Timestamp>,
    pub tcp: Vec<ApplicationSeries>,
    pub udp: Vec<ApplicationSeries>,
}

fn parse_optional<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, QueryError>
where
    T: FromStr<Err = String>,
{
    raw.map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| r.parse::<T>().map_err(|e| QueryError::validation(field, e)))
        .transpose()
}

fn parse_containment(raw: Option<&str>) -> Result<Containment, QueryError> {
    match raw.map(|r| r.trim().to_ascii_lowercase()) {
        None => Ok(Containment::default()),
        Some(r) if r.is_empty() || r == "lenient" => Ok(Containment::Lenient),
        Some(r) if r == "strict" => Ok(Containment::Strict),
        Some(r) => Err(QueryError::validation(
            "containment",
            format!("unknown containment {:?}, expected lenient or strict", r),
        )),
    }
}

/// Stateless front of the query layer. Every call re-fetches from storage;
/// nothing is cached between calls.
pub struct QueryService {
    storage: Arc<dyn Storage>,
    timeout: Duration,
}

impl QueryService {
    pub fn new(storage: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(QueryError::from),
            Err(_) => {
                warn!("Storage call exceeded {} ms", self.timeout.as_millis());
                Err(QueryError::Timeout(self.timeout))
            }
        }
    }

    /// Validates both bounds, then returns the per-application sessions of
    /// `[start, end)`.
    pub async fn get_data(&self, start: Option<&str>, end: Option<&str>) -> Result<Vec<AppSession>, QueryError> {
        let range = super::timestamp::parse_range(start, end)?;
        self.get_data_in(range).await
    }

    pub async fn get_data_in(&self, range: TimeRange) -> Result<Vec<AppSession>, QueryError> {
        let filter = in_range(range.start, range.end);
        let mut groups = self.bounded(self.storage.fetch_sessions(&filter)).await?;
        groups.retain(|g| !g.sessions.is_empty());
        for group in &mut groups {
            group.sessions.sort_by_key(|s| s.start);
        }
        debug!(
            "Window [{}, {}) matched {} applications",
            range.start,
            range.end,
            groups.len()
        );
        Ok(groups)
    }

    pub async fn get_summary(&self, query: &SummaryQuery) -> Result<DashboardSummary, QueryError> {
        let range = super::timestamp::parse_range(query.start.as_deref(), query.end.as_deref())?;
        let interval: BucketInterval =
            parse_optional("interval", query.interval.as_deref())?.unwrap_or_default();
        let metric: Metric = parse_optional("metric", query.metric.as_deref())?.unwrap_or(Metric::Bytes);
        let unit: ByteUnit = parse_optional("unit", query.unit.as_deref())?.unwrap_or_default();
        let containment = parse_containment(query.containment.as_deref())?;

        let data = self.get_data_in(range).await?;

        let applications: Vec<Application> = data.iter().map(|g| g.application.clone()).collect();
        let total = aggregate(&data);
        let colors = palette::resolve_colors(&applications);
        let window_secs = (range.end.saturating_sub(range.start) / 1000).max(0) as u64;
        let intervals = bucket(&data, interval.width(), metric);
        let intervals_in_unit = intervals.in_unit(unit);
        let labels = timeline(&data);
        let tcp = sample_at(&data, &labels, SampleField::PktTcp, containment);
        let udp = sample_at(&data, &labels, SampleField::PktUdp, containment);

        Ok(DashboardSummary {
            range,
            tx_human: units::human(total.bytes_tx),
            rx_human: units::human(total.bytes_rx),
            rate_human: units::human_rate(total.bytes_tx.saturating_add(total.bytes_rx), window_secs),
            total,
            fill_colors: palette::fill_colors(&colors, FILL_OPACITY),
            colors,
            application_bytes: application_totals(&data, Metric::Bytes),
            application_packets: application_totals(&data, Metric::Packets),
            application_protocol_packets: application_totals(&data, Metric::Protocol),
            interval,
            unit,
            intervals,
            intervals_in_unit,
            timeline: labels,
            tcp,
            udp,
            data,
        })
    }

    pub async fn list_applications(&self) -> Result<Vec<Application>, QueryError> {
        self.bounded(self.storage.list_applications()).await
    }

    /// Updates only `colorHex` of the application called `name`. Repeating the
    /// same call leaves the same state.
    pub async fn set_application_color(&self, name: &str, color_hex: &str) -> Result<(), QueryError> {
        if name.trim().is_empty() {
            return Err(QueryError::validation("name", "is required"));
        }
        if !color_hex.is_empty() && !color_pattern().is_match(color_hex) {
            return Err(QueryError::validation(
                "colorHex",
                format!("{:?} is not #RRGGBB or #RRGGBBAA", color_hex),
            ));
        }
        let touched = self
            .bounded(self.storage.update_application_color(name, color_hex))
            .await?;
        if touched == 0 {
            return Err(QueryError::NotFound(format!("application {:?}", name)));
        }
        Ok(())
    }

    /// All-or-nothing: either every application is stored or none is.
    pub async fn register_applications(&self, batch: &[NewApplication]) -> Result<(), QueryError> {
        let unnamed: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, app)| app.name.trim().is_empty())
            .map(|(index, _)| index)
            .collect();
        if !unnamed.is_empty() {
            return Err(QueryError::validation(
                "name",
                format!("empty at indices {:?}", unnamed),
            ));
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.bounded(self.storage.insert_applications(batch)).await
    }

    /// All-or-nothing, like `register_applications`. Sessions whose tcp/udp
    /// split exceeds their packet count are stored anyway and logged.
    pub async fn record_sessions(&self, batch: &[Session]) -> Result<(), QueryError> {
        let skewed: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.protocol_split_consistent())
            .map(|(index, _)| index)
            .collect();
        if !skewed.is_empty() {
            warn!(
                "Sessions {:?} report more tcp+udp packets than tx+rx packets",
                skewed
            );
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.bounded(self.storage.insert_sessions(batch)).await
    }
}
