use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Context attached to an `Error`, scoped to a single allocation run
/// rather than an HTTP request — there is no request boundary in a batch
/// core, so the correlating identifier is the run id (§6: one run per
/// forecast date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub error_id: String,
    pub run_id: Option<String>,
    pub forecast_date: Option<chrono::NaiveDate>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub trace: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            error_id: Uuid::new_v4().to_string(),
            run_id: None,
            forecast_date: None,
            metadata: HashMap::new(),
            trace: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_forecast_date(mut self, date: chrono::NaiveDate) -> Self {
        self.forecast_date = Some(date);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn add_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace.push(trace.into());
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Carries the identity of the currently running allocation pass
/// (forecast date, run id, pass) through driver and component calls for
/// logging correlation. Analogous to the teacher's `RequestContext` but
/// scoped to a batch run instead of an HTTP request.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub forecast_date: chrono::NaiveDate,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl RunContext {
    pub fn new(forecast_date: chrono::NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            forecast_date,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn to_error_context(&self) -> ErrorContext {
        ErrorContext::new()
            .with_run_id(self.run_id.clone())
            .with_forecast_date(self.forecast_date)
    }
}
