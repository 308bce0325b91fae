use super::{Error, ErrorCategory, ErrorSeverity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Error counters for a single allocation run.
///
/// A daily batch process has no concurrent request load to rate-limit
/// against, so this drops the teacher's sliding-window error-rate
/// tracker and async locking in favor of plain atomics behind a
/// `Mutex`-free map built once per run.
#[derive(Debug)]
pub struct ErrorMetrics {
    category_counts: Mutex<HashMap<ErrorCategory, AtomicU64>>,
    severity_counts: Mutex<HashMap<ErrorSeverity, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self {
            category_counts: Mutex::new(HashMap::new()),
            severity_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Record an error occurrence and log it at a severity-appropriate level.
    pub fn record_error(&self, error: &Error) {
        {
            let mut counts = self.category_counts.lock().expect("error metrics lock poisoned");
            counts
                .entry(error.category())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
        {
            let mut counts = self.severity_counts.lock().expect("error metrics lock poisoned");
            counts
                .entry(error.severity)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }

        match error.severity {
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_id = %error.context.error_id,
                    error_code = ?error.code,
                    "low severity error recorded"
                );
            }
            ErrorSeverity::Medium => {
                tracing::info!(
                    error_id = %error.context.error_id,
                    error_code = ?error.code,
                    message = %error.message,
                    "medium severity error recorded"
                );
            }
            ErrorSeverity::High => {
                tracing::warn!(
                    error_id = %error.context.error_id,
                    error_code = ?error.code,
                    message = %error.message,
                    details = ?error.details,
                    "high severity error recorded"
                );
            }
            ErrorSeverity::Critical => {
                tracing::error!(
                    error_id = %error.context.error_id,
                    error_code = ?error.code,
                    message = %error.message,
                    details = ?error.details,
                    run_id = ?error.context.run_id,
                    "critical error recorded"
                );
            }
        }
    }

    pub fn get_error_count(&self, category: ErrorCategory) -> u64 {
        let counts = self.category_counts.lock().expect("error metrics lock poisoned");
        counts.get(&category).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn get_severity_count(&self, severity: ErrorSeverity) -> u64 {
        let counts = self.severity_counts.lock().expect("error metrics lock poisoned");
        counts.get(&severity).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn snapshot(&self) -> ErrorMetricsSnapshot {
        let category_counts = self
            .category_counts
            .lock()
            .expect("error metrics lock poisoned")
            .iter()
            .map(|(k, v)| (*k, v.load(Ordering::Relaxed)))
            .collect();
        let severity_counts = self
            .severity_counts
            .lock()
            .expect("error metrics lock poisoned")
            .iter()
            .map(|(k, v)| (*k, v.load(Ordering::Relaxed)))
            .collect();

        ErrorMetricsSnapshot {
            category_counts,
            severity_counts,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of error metrics at the end of a run, written to the run log.
#[derive(Debug, Clone)]
pub struct ErrorMetricsSnapshot {
    pub category_counts: HashMap<ErrorCategory, u64>,
    pub severity_counts: HashMap<ErrorSeverity, u64>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorMetricsSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "category_counts": self.category_counts,
            "severity_counts": self.severity_counts,
            "timestamp": self.timestamp,
        })
    }
}
