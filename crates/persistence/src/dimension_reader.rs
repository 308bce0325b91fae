//! Dimension and fact readers: loads the §6 input tables into an
//! `allocation_domain::Context` plus `allocation_engine_lib::RunInputs`
//! at the start of a run. Grounded on the teacher's repository-over-a-pool
//! shape (`crates/master-data/src/inventory/repository.rs`) but using the
//! runtime-checked `sqlx::query_as` style from
//! `crates/auth/src/repository.rs`, since this repo carries no offline
//! query cache for the compile-time-checked `sqlx::query!` macro.

use allocation_domain::{
    CalendarDay, Context, Crop, Customer, DemandLine, Facility, FacilityLine,
    HarvestForecastEntry, InventoryLot, PlannedTransfer, Product, RouteConstraint,
};
use allocation_engine_lib::RunInputs;
use async_trait::async_trait;
use chrono::NaiveDate;
use erp_core::{DatabasePool, Result};
use sqlx::PgPool;

#[async_trait]
pub trait DimensionReader: Send + Sync {
    async fn facilities(&self) -> Result<Vec<Facility>>;
    async fn facility_lines(&self) -> Result<Vec<FacilityLine>>;
    async fn crops(&self) -> Result<Vec<Crop>>;
    async fn products(&self) -> Result<Vec<Product>>;
    async fn customers(&self) -> Result<Vec<Customer>>;
    async fn routes(&self) -> Result<Vec<RouteConstraint>>;
    async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>>;
    async fn harvest_forecast(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<HarvestForecastEntry>>;
    async fn demand_lines(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DemandLine>>;
    async fn inventory_actuals(&self, forecast_date: NaiveDate) -> Result<Vec<InventoryLot>>;
    async fn planned_transfers(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlannedTransfer>>;
}

pub struct PostgresDimensionReader {
    pool: DatabasePool,
}

impl PostgresDimensionReader {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn pg(&self) -> &PgPool {
        &self.pool.pool
    }
}

#[async_trait]
impl DimensionReader for PostgresDimensionReader {
    async fn facilities(&self) -> Result<Vec<Facility>> {
        sqlx::query_as::<_, Facility>("SELECT id, city_code, latitude, longitude FROM facility")
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn facility_lines(&self) -> Result<Vec<FacilityLine>> {
        sqlx::query_as::<_, FacilityLine>("SELECT id, facility_id, name FROM facility_line")
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn crops(&self) -> Result<Vec<Crop>> {
        sqlx::query_as::<_, Crop>("SELECT id, grams_per_unit FROM crop")
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn products(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            "SELECT id, crop_id, net_weight_g, whole, shelf_life_guarantee_days, \
             total_shelf_life_days, production_priority, lead_time_days, \
             case_equivalent_multiplier, cases_per_pallet FROM product",
        )
        .fetch_all(self.pg())
        .await
        .map_err(Into::into)
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        sqlx::query_as::<_, Customer>("SELECT id, fill_goal FROM customer")
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn routes(&self) -> Result<Vec<RouteConstraint>> {
        sqlx::query_as::<_, RouteConstraint>(
            "SELECT id, ship_facility, arrival_facility, ship_day_of_week, pack_lead_time_days, \
             transit_days, max_pallet_capacity, food_service_only FROM route_constraint",
        )
        .fetch_all(self.pg())
        .await
        .map_err(Into::into)
    }

    async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        sqlx::query_as::<_, CalendarDay>("SELECT date, year, week, day_of_week FROM calendar_day WHERE date BETWEEN $1 AND $2")
            .bind(start)
            .bind(end)
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn harvest_forecast(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<HarvestForecastEntry>> {
        sqlx::query_as::<_, HarvestForecastEntry>(
            "SELECT date, facility_id, line_id, crop_id, expected_plant_sites, mean_headweight_g, \
             mean_loose_g_per_plant_site FROM harvest_forecast WHERE date BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pg())
        .await
        .map_err(Into::into)
    }

    async fn demand_lines(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DemandLine>> {
        sqlx::query_as::<_, DemandLine>(
            "SELECT demand_date, allocation_date, facility_id, product_id, customer_id, demand_qty, \
             rollover_qty, safety_stock_qty, fill_goal, production_priority FROM customer_demand_forecast \
             WHERE allocation_date BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pg())
        .await
        .map_err(Into::into)
    }

    async fn inventory_actuals(&self, forecast_date: NaiveDate) -> Result<Vec<InventoryLot>> {
        sqlx::query_as::<_, InventoryLot>("SELECT facility_id, product_id, enjoy_by_date, qty FROM inventory_actual WHERE as_of_date = $1")
            .bind(forecast_date)
            .fetch_all(self.pg())
            .await
            .map_err(Into::into)
    }

    async fn planned_transfers(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlannedTransfer>> {
        sqlx::query_as::<_, PlannedTransfer>(
            "SELECT ship_date, arrival_date, ship_facility_id, arrival_facility_id, product_id, \
             enjoy_by_date, qty FROM planned_transfer WHERE ship_date BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pg())
        .await
        .map_err(Into::into)
    }
}

/// Loads every input table needed for one `run(forecast_date)` invocation
/// and assembles the `Context` plus `RunInputs` the engine crate's driver
/// consumes. `horizon_days` comes from `AppConfig::forecast_horizon_days`.
pub async fn load_run_inputs(reader: &dyn DimensionReader, forecast_date: NaiveDate, horizon_days: i64, run_id: String) -> Result<(Context, RunInputs)> {
    let horizon_end = forecast_date + chrono::Duration::days(horizon_days - 1);

    let facilities = reader.facilities().await?;
    let facility_lines = reader.facility_lines().await?;
    let crops = reader.crops().await?;
    let products = reader.products().await?;
    let customers = reader.customers().await?;
    let routes = reader.routes().await?;
    let calendar = reader.calendar(forecast_date, horizon_end).await?;
    let harvest_forecast = reader.harvest_forecast(forecast_date, horizon_end).await?;

    let ctx = Context::new(
        forecast_date,
        run_id,
        facilities,
        facility_lines,
        crops,
        products,
        customers,
        routes,
        harvest_forecast,
        calendar,
    );

    let allocation_dates: Vec<NaiveDate> = (0..horizon_days).map(|offset| forecast_date + chrono::Duration::days(offset)).collect();

    let inventory_actuals = reader.inventory_actuals(forecast_date).await?;
    let demand_lines = reader.demand_lines(forecast_date, horizon_end).await?;
    let planned_transfers = reader.planned_transfers(forecast_date, horizon_end).await?;

    let inputs = RunInputs {
        allocation_dates,
        inventory_actuals,
        demand_lines,
        planned_transfers,
    };

    Ok((ctx, inputs))
}
