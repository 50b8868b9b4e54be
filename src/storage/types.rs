use serde::{Deserialize, Serialize};

/// Epoch milliseconds, UTC.
pub type Timestamp = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub name: String,
    /// Empty string means no color has been picked yet.
    #[serde(default)]
    pub color_hex: String,
}

/// Application as submitted by a producer, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub name: String,
    #[serde(default)]
    pub color_hex: String,
}

impl NewApplication {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            color_hex: String::new(),
        }
    }
}

/// One recorded traffic window for an application. Immutable once stored.
///
/// Serializes with a derived `pktTotal`; the field is ignored on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", into = "SessionView")]
pub struct Session {
    pub start: Timestamp,
    pub duration_sec: u64,
    pub application_id: i64,
    pub bytes_tx: u64,
    pub bytes_rx: u64,
    pub pkt_tx: u64,
    pub pkt_rx: u64,
    pub pkt_tcp: u64,
    pub pkt_udp: u64,
}

impl Session {
    pub fn pkt_total(&self) -> u64 {
        self.pkt_tx.saturating_add(self.pkt_rx)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes_tx.saturating_add(self.bytes_rx)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.duration_sec as i64).saturating_mul(1000)
    }

    /// tcp + udp should never exceed the overall packet count. The collector
    /// does not enforce it, so this is only checked, never rejected on.
    pub fn protocol_split_consistent(&self) -> bool {
        self.pkt_tcp.saturating_add(self.pkt_udp) <= self.pkt_total()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    start: Timestamp,
    duration_sec: u64,
    application_id: i64,
    bytes_tx: u64,
    bytes_rx: u64,
    pkt_tx: u64,
    pkt_rx: u64,
    pkt_total: u64,
    pkt_tcp: u64,
    pkt_udp: u64,
}

impl From<Session> for SessionView {
    fn from(s: Session) -> Self {
        SessionView {
            pkt_total: s.pkt_total(),
            start: s.start,
            duration_sec: s.duration_sec,
            application_id: s.application_id,
            bytes_tx: s.bytes_tx,
            bytes_rx: s.bytes_rx,
            pkt_tx: s.pkt_tx,
            pkt_rx: s.pkt_rx,
            pkt_tcp: s.pkt_tcp,
            pkt_udp: s.pkt_udp,
        }
    }
}

/// An application paired with its sessions inside one queried window,
/// sorted ascending by `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSession {
    pub application: Application,
    pub sessions: Vec<Session>,
}

/// Half-open `[start, end)` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Criteria for a session fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    pub range: TimeRange,
    /// Restrict to one application, by unique name.
    pub application: Option<String>,
}
