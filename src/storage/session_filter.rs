//! Helpers for building `SessionFilter` values.
//!
//! This module re-exports `SessionFilter` and provides convenience builders
//! for common query criteria.

// Re-export SessionFilter
pub use crate::storage::types::SessionFilter;
use crate::storage::types::{TimeRange, Timestamp};

/// Build a `SessionFilter` matching every application inside `[start, end)`.
pub fn in_range(start: Timestamp, end: Timestamp) -> SessionFilter {
    SessionFilter {
        range: TimeRange::new(start, end),
        application: None,
    }
}

impl SessionFilter {
    /// Restrict the filter to one application by exact name.
    pub fn for_application<S: Into<String>>(mut self, name: S) -> Self {
        self.application = Some(name.into());
        self
    }

    pub(crate) fn matches_application(&self, name: &str) -> bool {
        self.application.as_deref().map_or(true, |wanted| wanted == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let filter = in_range(10, 20).for_application("browser");
        assert_eq!(filter.range, TimeRange::new(10, 20));
        assert!(filter.matches_application("browser"));
        assert!(!filter.matches_application("mail"));
        assert!(in_range(0, 1).matches_application("anything"));
    }
}
