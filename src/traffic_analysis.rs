//! Pure transformations over fetched sessions: totals, interval buckets,
//! point-in-time samples and the presentation helpers around them.
//!
//! Nothing in here performs I/O or fails; inputs are already-validated rows.

pub mod aggregator;
pub mod interval_bucketer;
pub mod palette;
pub mod point_sampler;
pub mod types;
pub mod units;

pub use aggregator::{aggregate, application_totals};
pub use interval_bucketer::{bucket, BucketInterval, IntervalSeries};
pub use point_sampler::{sample_at, timeline, Containment};
pub use types::{ApplicationSeries, ApplicationTotal, Metric, SampleField, SessionTotal};
pub use units::ByteUnit;
