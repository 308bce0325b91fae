use super::RunEvent;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Backend that persists the allocation run log (§6/§7 event vocabulary).
#[async_trait]
pub trait RunEventBackend: Send + Sync {
    async fn store_event(&self, event: &RunEvent) -> Result<()>;
    async fn retrieve_events(&self, filter: &RunEventFilter) -> Result<Vec<RunEvent>>;
    async fn health_check(&self) -> Result<BackendHealth>;
}

#[derive(Debug, Clone)]
pub struct BackendHealth {
    pub is_healthy: bool,
    pub message: Option<String>,
}

/// Filter for querying the run log, e.g. by the driver's end-of-run
/// summary or an operator diagnosing a prior run.
#[derive(Debug, Clone, Default)]
pub struct RunEventFilter {
    pub run_id: Option<String>,
    pub forecast_date: Option<chrono::NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl RunEventFilter {
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            ..Default::default()
        }
    }

    pub fn for_forecast_date(forecast_date: chrono::NaiveDate) -> Self {
        Self {
            forecast_date: Some(forecast_date),
            ..Default::default()
        }
    }
}

/// A record stamped with the append-only change-data-capture contract of
/// §6: every output fact table carries `load_date`, `to_date` (a
/// far-future sentinel until superseded), and `is_active`.
pub trait CdcRecord {
    fn natural_key(&self) -> String;
    fn table_name() -> &'static str;
}
