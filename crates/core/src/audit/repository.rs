use super::{
    event::{EventOutcome, EventSeverity, EventType},
    traits::{BackendHealth, RunEventBackend, RunEventFilter},
    RunEvent,
};
use crate::error::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

/// Database-backed run log: one row per [`RunEvent`], queried by run id
/// or forecast date for diagnostics after the fact.
pub struct DatabaseRunEventRepository {
    pool: Arc<PgPool>,
    table_name: String,
}

impl DatabaseRunEventRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            table_name: "run_events".to_string(),
        }
    }

    pub async fn initialize(&self) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id VARCHAR(255) PRIMARY KEY,
                event_type VARCHAR(64) NOT NULL,
                severity VARCHAR(20) NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                run_id VARCHAR(255) NOT NULL,
                forecast_date DATE NOT NULL,
                description TEXT NOT NULL,
                metadata JSONB,
                outcome VARCHAR(20) NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_run_id ON {table} (run_id);
            CREATE INDEX IF NOT EXISTS idx_{table}_forecast_date ON {table} (forecast_date);
            "#,
            table = self.table_name,
        );

        sqlx::query(&sql).execute(self.pool.as_ref()).await?;
        info!(table = %self.table_name, "run event table initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RunEventBackend for DatabaseRunEventRepository {
    async fn store_event(&self, event: &RunEvent) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, event_type, severity, timestamp, run_id, forecast_date, description, metadata, outcome)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            self.table_name
        );

        sqlx::query(&sql)
            .bind(&event.id)
            .bind(event.event_type.to_string())
            .bind(event.severity.to_string())
            .bind(event.timestamp)
            .bind(&event.run_id)
            .bind(event.forecast_date)
            .bind(&event.description)
            .bind(serde_json::to_value(&event.metadata).unwrap_or(serde_json::Value::Null))
            .bind(event.outcome.to_string())
            .execute(self.pool.as_ref())
            .await?;

        debug!(event_id = %event.id, "stored run event");
        Ok(())
    }

    async fn retrieve_events(&self, filter: &RunEventFilter) -> Result<Vec<RunEvent>> {
        let mut conditions = Vec::new();
        if filter.run_id.is_some() {
            conditions.push("run_id = $1".to_string());
        }
        if filter.forecast_date.is_some() {
            conditions.push(format!("forecast_date = ${}", conditions.len() + 1));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let limit_clause = filter.limit.map(|l| format!(" LIMIT {l}")).unwrap_or_default();

        let sql = format!(
            "SELECT id, event_type, severity, timestamp, run_id, forecast_date, description, metadata, outcome FROM {}{}{} ORDER BY timestamp ASC",
            self.table_name, where_clause, limit_clause
        );

        let mut query = sqlx::query(&sql);
        if let Some(run_id) = &filter.run_id {
            query = query.bind(run_id);
        }
        if let Some(forecast_date) = &filter.forecast_date {
            query = query.bind(forecast_date);
        }

        let rows = query.fetch_all(self.pool.as_ref()).await?;

        let events = rows
            .into_iter()
            .map(|row| parse_row(&row))
            .collect::<Result<Vec<_>>>()?;

        Ok(events)
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        match sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await {
            Ok(_) => Ok(BackendHealth {
                is_healthy: true,
                message: None,
            }),
            Err(e) => Ok(BackendHealth {
                is_healthy: false,
                message: Some(e.to_string()),
            }),
        }
    }
}

fn parse_row(row: &sqlx::postgres::PgRow) -> Result<RunEvent> {
    use sqlx::Row;

    let event_type = match row.get::<String, _>("event_type").as_str() {
        "RUN_STARTED" => EventType::RunStarted,
        "GATE_DECLINED" => EventType::GateDeclined,
        "INVENTORY_STATUS_MARKED" => EventType::InventoryStatusMarked,
        "BASELINE_PASS_COMPLETED" => EventType::BaselinePassCompleted,
        "PENDING_PASS_COMPLETED" => EventType::PendingPassCompleted,
        "MISSING_YIELD_WARNING" => EventType::MissingYieldWarning,
        "PLANNED_TRANSFER_SHORTFALL" => EventType::PlannedTransferShortfall,
        "UNKNOWN_REFERENCE_SKIPPED" => EventType::UnknownReferenceSkipped,
        "FULL_PACK_OUT" => EventType::FullPackOut,
        "PERSISTENCE_FAILURE" => EventType::PersistenceFailure,
        _ => EventType::RunCompleted,
    };

    let severity = match row.get::<String, _>("severity").as_str() {
        "warning" => EventSeverity::Warning,
        "critical" => EventSeverity::Critical,
        _ => EventSeverity::Info,
    };

    let outcome = match row.get::<String, _>("outcome").as_str() {
        "failure" => EventOutcome::Failure,
        "partial" => EventOutcome::Partial,
        _ => EventOutcome::Success,
    };

    Ok(RunEvent {
        id: row.get("id"),
        event_type,
        severity,
        timestamp: row.get("timestamp"),
        run_id: row.get("run_id"),
        forecast_date: row.get("forecast_date"),
        description: row.get("description"),
        metadata: serde_json::from_value(row.get::<serde_json::Value, _>("metadata")).unwrap_or_default(),
        outcome,
    })
}
