//! Instantaneous per-application values on a shared timeline.
//!
//! Used for the tcp/udp packet line charts: for each label, each
//! application contributes the field of the first session covering that
//! label, or `0` when none does. Series are always dense.

use serde::{Deserialize, Serialize};

use crate::storage::types::{AppSession, Session, Timestamp};

use super::types::{ApplicationSeries, SampleField};

/// How a session is judged to cover a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Containment {
    /// `label - start <= duration`, with no lower bound: a session starting
    /// after the label also matches. This is the dashboard's historical
    /// behavior and stays the default.
    #[default]
    Lenient,
    /// `start <= label < start + duration`. Changes results, opt in only.
    Strict,
}

impl Containment {
    pub fn covers(&self, s: &Session, label: Timestamp) -> bool {
        let duration = s.duration_ms();
        match self {
            Containment::Lenient => label.saturating_sub(s.start) <= duration,
            Containment::Strict => s.start <= label && label < s.start.saturating_add(duration),
        }
    }
}

/// Distinct session starts across all groups, ascending.
pub fn timeline(groups: &[AppSession]) -> Vec<Timestamp> {
    let mut labels: Vec<Timestamp> = groups
        .iter()
        .flat_map(|g| g.sessions.iter().map(|s| s.start))
        .collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

pub fn sample_at(
    groups: &[AppSession],
    labels: &[Timestamp],
    field: SampleField,
    containment: Containment,
) -> Vec<ApplicationSeries> {
    groups
        .iter()
        .map(|group| ApplicationSeries {
            application: group.application.clone(),
            values: labels
                .iter()
                .map(|label| {
                    group
                        .sessions
                        .iter()
                        .find(|s| containment.covers(s, *label))
                        .map_or(0, |s| field.of(s))
                })
                .collect(),
        })
        .collect()
}
