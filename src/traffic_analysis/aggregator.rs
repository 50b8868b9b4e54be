//! Running totals over already-fetched sessions.
//!
//! Both functions are pure folds. Which applications are included is decided
//! by the caller (e.g. only the ones selected on the dashboard), so the
//! input is any iterator over groups.

use crate::storage::types::AppSession;

use super::types::{ApplicationTotal, Metric, SessionTotal};

/// Sum every counter of every session in `groups`. Zero groups yield the
/// all-zero total. Counters are `u64`, so long windows cannot overflow a
/// 32-bit byte count.
pub fn aggregate<'a, I>(groups: I) -> SessionTotal
where
    I: IntoIterator<Item = &'a AppSession>,
{
    groups
        .into_iter()
        .flat_map(|group| group.sessions.iter())
        .fold(SessionTotal::default(), SessionTotal::add)
}

/// One sum of `metric` per application, in group order.
pub fn application_totals<'a, I>(groups: I, metric: Metric) -> Vec<ApplicationTotal>
where
    I: IntoIterator<Item = &'a AppSession>,
{
    groups
        .into_iter()
        .map(|group| ApplicationTotal {
            application: group.application.clone(),
            value: group.sessions.iter().fold(0u64, |acc, s| acc.saturating_add(metric.of(s))),
        })
        .collect()
}
