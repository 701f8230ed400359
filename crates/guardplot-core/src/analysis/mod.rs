pub mod delay;
pub mod grouping;
pub mod summary;

pub use delay::{derive_delays, reported_delay, DelayMode, DelayPoint, DelaySource};
pub use grouping::{group_by_thread, order_by_global_sequence, order_by_issue_time, ThreadGroups};
pub use summary::{summarize, RateStats, Summary};
