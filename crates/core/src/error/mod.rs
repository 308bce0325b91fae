//! Structured error handling for the allocation core.
//!
//! - **Structured error types**: a compact `ErrorCode` taxonomy shared by
//!   logs and metrics.
//! - **Run context**: errors carry the forecast date and run id they
//!   occurred under rather than an HTTP request id, since this core runs
//!   as a single daily batch pass with no request boundary.
//! - **Severity classification**: drives log level and metrics bucketing.
//! - **Metrics integration**: per-run error counters surfaced in the run
//!   log at the end of a pass.
//!
//! ## Usage
//!
//! ```rust
//! use erp_core::error::{Error, ErrorCode, Result};
//!
//! fn resolve_crop(crop_id: i32) -> Result<()> {
//!     if crop_id <= 0 {
//!         return Err(Error::validation("crop id must be positive"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod context;
pub mod framework;
pub mod metrics;

pub use codes::ErrorCode;
pub use context::{ErrorContext, RunContext};
pub use framework::{Error, ErrorCategory, ErrorSeverity, Result};
pub use metrics::{ErrorMetrics, ErrorMetricsSnapshot};
