//! Postgres-backed implementation of `erp_core::jobs::RunGate` against the
//! §6 inventory-status log table: has today's actual inventory been
//! loaded, and has allocation already run today. Grounded on
//! `erp_core::audit::repository::DatabaseRunEventRepository`'s
//! query-and-insert-over-a-pool shape.

use async_trait::async_trait;
use chrono::NaiveDate;
use erp_core::jobs::RunGate;
use erp_core::{DatabasePool, Result};
use sqlx::{PgPool, Row};
use tracing::info;

pub struct PostgresRunGate {
    pool: DatabasePool,
    table_name: String,
}

impl PostgresRunGate {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            table_name: "inventory_status_log".to_string(),
        }
    }

    fn pg(&self) -> &PgPool {
        &self.pool.pool
    }

    pub async fn initialize(&self) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                forecast_date DATE NOT NULL,
                event VARCHAR(32) NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_forecast_date ON {table} (forecast_date, event);
            "#,
            table = self.table_name,
        );
        sqlx::query(&sql).execute(self.pg()).await?;
        Ok(())
    }
}

#[async_trait]
impl RunGate for PostgresRunGate {
    async fn inventory_loaded(&self, forecast_date: NaiveDate) -> Result<bool> {
        let sql = format!("SELECT count(*) AS n FROM {} WHERE forecast_date = $1 AND event = 'inventory_loaded'", self.table_name);
        let row = sqlx::query(&sql).bind(forecast_date).fetch_one(self.pg()).await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    async fn allocation_already_run(&self, forecast_date: NaiveDate) -> Result<bool> {
        let sql = format!("SELECT count(*) AS n FROM {} WHERE forecast_date = $1 AND event = 'allocation_run'", self.table_name);
        let row = sqlx::query(&sql).bind(forecast_date).fetch_one(self.pg()).await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    async fn mark_inventory_status(&self, forecast_date: NaiveDate) -> Result<()> {
        let sql = format!("INSERT INTO {} (forecast_date, event) VALUES ($1, 'allocation_run')", self.table_name);
        sqlx::query(&sql).bind(forecast_date).execute(self.pg()).await?;
        info!(%forecast_date, "marked inventory status for gate pass");
        Ok(())
    }
}
