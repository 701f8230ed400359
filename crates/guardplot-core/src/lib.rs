pub mod analysis;
pub mod config;
pub mod error;
pub mod log;
pub mod report;

pub use config::ReportConfig;
pub use error::GuardplotError;
pub use log::{parse_log, read_log, LogDocument};
pub use report::{assemble_report, AnalysisReport};
