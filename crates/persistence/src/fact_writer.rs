//! Fact writers: the §6 append-only CDC contract for the seven output
//! table families, each with a baseline and pending variant selected by
//! the driver's `Pass`. Every write is two steps inside one statement
//! sequence: supersede the forecast date's currently-active rows
//! (`is_active = false`, `to_date = now()`), then insert the pass's rows
//! as newly active. Grounded on `DatabaseRunEventRepository`'s
//! raw-SQL-over-a-pool style (`erp_core::audit::repository`) — these
//! record types are produced entirely in-process, so there is no schema
//! an `sqlx::query!` macro could check against at compile time.

use allocation_domain::{
    CalculatedTransferRecord, HarvestAllocationRecord, HarvestLedgerSnapshotRecord,
    HarvestUnallocatedRecord, InventoryAllocationRecord, Pass, ShortDemandRecord, StopSellRecord,
};
use allocation_engine_lib::PassOutput;
use async_trait::async_trait;
use chrono::NaiveDate;
use erp_core::audit::CdcRecord;
use erp_core::{DatabasePool, Result};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

fn sentinel_to_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()
}

/// Persists one pass's worth of output records under the §6 CDC contract.
#[async_trait]
pub trait FactWriter: Send + Sync {
    async fn write_pass(&self, pass: Pass, forecast_date: NaiveDate, output: &PassOutput) -> Result<()>;
}

pub struct PostgresFactWriter {
    pool: DatabasePool,
}

impl PostgresFactWriter {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Marks every currently-active row in `table` whose `date_column`
/// matches `forecast_date` as superseded. Run once per table before
/// that table's rows for this pass are inserted.
async fn supersede(tx: &mut Transaction<'_, Postgres>, table: &str, date_column: &str, forecast_date: NaiveDate) -> Result<()> {
    let sql = format!(
        "UPDATE {table} SET is_active = false, to_date = now() WHERE {date_column} = $1 AND is_active = true"
    );
    sqlx::query(&sql).bind(forecast_date).execute(&mut **tx).await?;
    Ok(())
}

async fn write_inventory_allocations(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[InventoryAllocationRecord],
) -> Result<()> {
    supersede(tx, table, "forecast_date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (forecast_date, facility_id, product_id, enjoy_by_date, customer_id, \
             start_of_day_qty, allocated_qty, end_of_day_qty, tier, load_date, to_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), $10, true)"
        );
        sqlx::query(&sql)
            .bind(row.forecast_date)
            .bind(row.facility_id)
            .bind(row.product_id)
            .bind(row.enjoy_by_date)
            .bind(row.customer_id)
            .bind(row.start_of_day_qty)
            .bind(row.allocated_qty)
            .bind(row.end_of_day_qty)
            .bind(row.tier as i32)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote inventory allocation row");
    }
    info!(table, count = rows.len(), "wrote inventory allocation rows");
    Ok(())
}

async fn write_harvest_allocations(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[HarvestAllocationRecord],
) -> Result<()> {
    supersede(tx, table, "allocation_date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (allocation_date, demand_date, harvest_facility_id, demand_facility_id, \
             crop_id, product_id, customer_id, forecasted_gpps, allocated_plant_sites, allocated_grams, \
             allocated_qty, full_packout, tier, load_date, to_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now(), $14, true)"
        );
        sqlx::query(&sql)
            .bind(row.allocation_date)
            .bind(row.demand_date)
            .bind(row.harvest_facility_id)
            .bind(row.demand_facility_id)
            .bind(row.crop_id)
            .bind(row.product_id)
            .bind(row.customer_id)
            .bind(row.forecasted_gpps)
            .bind(row.allocated_plant_sites)
            .bind(row.allocated_grams)
            .bind(row.allocated_qty)
            .bind(row.full_packout)
            .bind(row.tier as i32)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote harvest allocation row");
    }
    info!(table, count = rows.len(), "wrote harvest allocation rows");
    Ok(())
}

async fn write_short_demand(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[ShortDemandRecord],
) -> Result<()> {
    supersede(tx, table, "allocation_date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (demand_date, allocation_date, facility_id, product_id, customer_id, \
             remaining_qty, production_priority, load_date, to_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), $8, true)"
        );
        sqlx::query(&sql)
            .bind(row.demand_date)
            .bind(row.allocation_date)
            .bind(row.facility_id)
            .bind(row.product_id)
            .bind(row.customer_id)
            .bind(row.remaining_qty)
            .bind(row.production_priority)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote short demand row");
    }
    info!(table, count = rows.len(), "wrote short demand rows");
    Ok(())
}

async fn write_stop_sell(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[StopSellRecord],
) -> Result<()> {
    supersede(tx, table, "forecast_date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (forecast_date, facility_id, product_id, enjoy_by_date, qty, \
             load_date, to_date, is_active) VALUES ($1, $2, $3, $4, $5, now(), $6, true)"
        );
        sqlx::query(&sql)
            .bind(row.forecast_date)
            .bind(row.facility_id)
            .bind(row.product_id)
            .bind(row.enjoy_by_date)
            .bind(row.qty)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote stop-sell row");
    }
    info!(table, count = rows.len(), "wrote stop-sell rows");
    Ok(())
}

async fn write_harvest_unallocated(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[HarvestUnallocatedRecord],
) -> Result<()> {
    supersede(tx, table, "date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (date, facility_id, crop_id, plant_sites, whole_grams, loose_grams, \
             unit_qty, load_date, to_date, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, now(), $8, true)"
        );
        sqlx::query(&sql)
            .bind(row.date)
            .bind(row.facility_id)
            .bind(row.crop_id)
            .bind(row.plant_sites)
            .bind(row.whole_grams)
            .bind(row.loose_grams)
            .bind(row.unit_qty)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote harvest-unallocated row");
    }
    info!(table, count = rows.len(), "wrote harvest-unallocated rows");
    Ok(())
}

async fn write_harvest_ledger_snapshot(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[HarvestLedgerSnapshotRecord],
) -> Result<()> {
    supersede(tx, table, "date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (date, crop_id, facility_id, starting_plant_sites, allocated_plant_sites, \
             sealed, load_date, to_date, is_active) VALUES ($1, $2, $3, $4, $5, $6, now(), $7, true)"
        );
        sqlx::query(&sql)
            .bind(row.date)
            .bind(row.crop_id)
            .bind(row.facility_id)
            .bind(row.starting_plant_sites)
            .bind(row.allocated_plant_sites)
            .bind(row.sealed)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote harvest ledger snapshot row");
    }
    info!(table, count = rows.len(), "wrote harvest ledger snapshot rows");
    Ok(())
}

async fn write_calculated_transfers(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    forecast_date: NaiveDate,
    rows: &[CalculatedTransferRecord],
) -> Result<()> {
    supersede(tx, table, "ship_date", forecast_date).await?;
    let sentinel = sentinel_to_date();
    for row in rows {
        let sql = format!(
            "INSERT INTO {table} (ship_date, arrival_date, ship_facility_id, arrival_facility_id, route_id, \
             product_id, enjoy_by_date, customer_id, qty, pallets, truck_index, load_date, to_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), $12, true)"
        );
        sqlx::query(&sql)
            .bind(row.ship_date)
            .bind(row.arrival_date)
            .bind(row.ship_facility_id)
            .bind(row.arrival_facility_id)
            .bind(row.route_id)
            .bind(row.product_id)
            .bind(row.enjoy_by_date)
            .bind(row.customer_id)
            .bind(row.qty)
            .bind(row.pallets)
            .bind(row.truck_index as i32)
            .bind(sentinel)
            .execute(&mut **tx)
            .await?;
        debug!(table, natural_key = %row.natural_key(), "wrote calculated transfer row");
    }
    info!(table, count = rows.len(), "wrote calculated transfer rows");
    Ok(())
}

#[async_trait]
impl FactWriter for PostgresFactWriter {
    /// Runs all seven table writes inside one transaction: a crash or error
    /// partway through rolls back rather than leaving, for example,
    /// short_demand superseded with harvest_allocations not yet reinserted.
    async fn write_pass(&self, pass: Pass, forecast_date: NaiveDate, output: &PassOutput) -> Result<()> {
        let suffix = pass.table_suffix();
        let mut tx = self.pool.pool.begin().await?;

        write_inventory_allocations(
            &mut tx,
            &format!("{}{suffix}", InventoryAllocationRecord::table_name()),
            forecast_date,
            &output.inventory_allocations,
        )
        .await?;
        write_harvest_allocations(
            &mut tx,
            &format!("{}{suffix}", HarvestAllocationRecord::table_name()),
            forecast_date,
            &output.harvest_allocations,
        )
        .await?;
        write_short_demand(
            &mut tx,
            &format!("{}{suffix}", ShortDemandRecord::table_name()),
            forecast_date,
            &output.short_demand,
        )
        .await?;
        write_stop_sell(&mut tx, &format!("{}{suffix}", StopSellRecord::table_name()), forecast_date, &output.stop_sell)
            .await?;
        write_harvest_unallocated(
            &mut tx,
            &format!("{}{suffix}", HarvestUnallocatedRecord::table_name()),
            forecast_date,
            &output.harvest_unallocated,
        )
        .await?;
        write_harvest_ledger_snapshot(
            &mut tx,
            &format!("{}{suffix}", HarvestLedgerSnapshotRecord::table_name()),
            forecast_date,
            &output.harvest_ledger_snapshot,
        )
        .await?;
        write_calculated_transfers(
            &mut tx,
            &format!("{}{suffix}", CalculatedTransferRecord::table_name()),
            forecast_date,
            &output.calculated_transfers,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
