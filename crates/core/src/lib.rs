pub mod audit;
pub mod config;
pub mod database;
pub mod error;
pub mod jobs;
pub mod metrics;

pub use audit::{RunEvent, RunLogger};
pub use config::{Config, HostAuthMode};
pub use database::DatabasePool;
pub use error::{Error, ErrorCode, ErrorContext, ErrorMetrics, Result, RunContext};
pub use jobs::{evaluate_gate, RunGate, RunOutcome, RunStatus};
pub use metrics::MetricsRegistry;

pub use chrono::{DateTime, NaiveDate, Utc};
pub use uuid::Uuid;
