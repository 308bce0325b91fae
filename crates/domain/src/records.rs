//! Fact and record types: the demand lines the driver constructs per tier,
//! and the allocation/prediction rows each component emits.

use crate::reference::{CropId, CustomerId, FacilityId, ProductId, RouteId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryLot {
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
    pub qty: i64,
}

impl InventoryLot {
    /// A lot whose quantity has reached zero is considered absent.
    pub fn is_present(&self) -> bool {
        self.qty > 0
    }

    pub fn merge(&mut self, incoming_qty: i64) {
        self.qty += incoming_qty;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DemandLine {
    pub demand_date: NaiveDate,
    pub allocation_date: NaiveDate,
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub demand_qty: i64,
    pub rollover_qty: i64,
    pub safety_stock_qty: i64,
    pub fill_goal: f64,
    pub production_priority: i32,
}

impl DemandLine {
    /// `demand_qty - rollover_qty - safety_stock_qty`, the portion the
    /// inventory allocator is responsible for.
    pub fn effective_demand(&self) -> i64 {
        self.demand_qty - self.rollover_qty - self.safety_stock_qty
    }

    /// Scales this line to a tier's fill goal, half-up rounding each
    /// component independently per spec §4.8/§9.
    pub fn scaled_to_fill_goal(&self, fill_goal: f64) -> DemandLine {
        let base = (self.demand_qty - self.rollover_qty - self.safety_stock_qty) as f64;
        let round_half_up = |v: f64| -> i64 { (v + 0.5).floor() as i64 };
        let rollover_qty = round_half_up(self.rollover_qty as f64 * fill_goal);
        let safety_qty = round_half_up(self.safety_stock_qty as f64 * fill_goal);
        let demand_qty = round_half_up(base * fill_goal) + rollover_qty + safety_qty;
        DemandLine {
            demand_qty,
            rollover_qty,
            safety_stock_qty: safety_qty,
            fill_goal,
            ..self.clone()
        }
    }

    /// The complement of `scaled_to_fill_goal` for the second-pass sweep:
    /// what remains of this line once the first pass already took its
    /// fill-goal share.
    pub fn complement_of_fill_goal(&self, fill_goal: f64) -> DemandLine {
        let first_pass = self.scaled_to_fill_goal(fill_goal);
        DemandLine {
            demand_qty: self.demand_qty - first_pass.demand_qty,
            rollover_qty: self.rollover_qty - first_pass.rollover_qty,
            safety_stock_qty: self.safety_stock_qty - first_pass.safety_stock_qty,
            fill_goal: 1.0 - fill_goal,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAllocationRecord {
    pub forecast_date: NaiveDate,
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
    pub customer_id: Option<CustomerId>,
    pub start_of_day_qty: i64,
    pub allocated_qty: i64,
    pub end_of_day_qty: i64,
    pub tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestAllocationRecord {
    pub allocation_date: NaiveDate,
    pub demand_date: NaiveDate,
    pub harvest_facility_id: FacilityId,
    pub demand_facility_id: FacilityId,
    pub crop_id: CropId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub forecasted_gpps: f64,
    pub allocated_plant_sites: f64,
    pub allocated_grams: f64,
    pub allocated_qty: i64,
    pub full_packout: bool,
    pub tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortDemandRecord {
    pub demand_date: NaiveDate,
    pub allocation_date: NaiveDate,
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub remaining_qty: i64,
    pub production_priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSellRecord {
    pub forecast_date: NaiveDate,
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestUnallocatedRecord {
    pub date: NaiveDate,
    pub facility_id: FacilityId,
    pub crop_id: CropId,
    pub plant_sites: f64,
    pub whole_grams: f64,
    pub loose_grams: f64,
    pub unit_qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatedTransferRecord {
    pub ship_date: NaiveDate,
    pub arrival_date: NaiveDate,
    pub ship_facility_id: FacilityId,
    pub arrival_facility_id: FacilityId,
    pub route_id: RouteId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
    pub customer_id: Option<CustomerId>,
    pub qty: i64,
    pub pallets: f64,
    pub truck_index: u32,
}

/// End-of-pass snapshot of one harvest-ledger entry (the seventh §6 output
/// family, distinct from the customer-directed harvest-allocation rows):
/// one row per (date, crop, facility) key showing its final starting and
/// allocated plant sites and seal state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HarvestLedgerSnapshotRecord {
    pub date: NaiveDate,
    pub crop_id: CropId,
    pub facility_id: FacilityId,
    pub starting_plant_sites: f64,
    pub allocated_plant_sites: f64,
    pub sealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlannedTransfer {
    pub ship_date: NaiveDate,
    pub arrival_date: NaiveDate,
    pub ship_facility_id: FacilityId,
    pub arrival_facility_id: FacilityId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
    pub qty: i64,
}

/// The §6 CDC natural key and table name for each output family, used by
/// the persistence layer's supersede-then-insert writers. Tables are named
/// after the spec's output table list; the pass suffix (`_pending`) is
/// applied by the writer, not here.
mod cdc {
    use super::*;
    use erp_core::audit::CdcRecord;

    impl CdcRecord for InventoryAllocationRecord {
        fn natural_key(&self) -> String {
            format!(
                "{}|{}|{}|{}|{}",
                self.forecast_date,
                self.facility_id,
                self.product_id,
                self.enjoy_by_date,
                self.customer_id.map(|c| c.to_string()).unwrap_or_else(|| "null".to_string()),
            )
        }

        fn table_name() -> &'static str {
            "customer_inventory_allocation"
        }
    }

    impl CdcRecord for HarvestAllocationRecord {
        fn natural_key(&self) -> String {
            format!(
                "{}|{}|{}|{}|{}|{}",
                self.allocation_date, self.harvest_facility_id, self.demand_facility_id, self.crop_id, self.product_id, self.customer_id,
            )
        }

        fn table_name() -> &'static str {
            "customer_harvest_allocation"
        }
    }

    impl CdcRecord for ShortDemandRecord {
        fn natural_key(&self) -> String {
            format!(
                "{}|{}|{}|{}",
                self.demand_date, self.facility_id, self.product_id, self.customer_id,
            )
        }

        fn table_name() -> &'static str {
            "customer_short_demand"
        }
    }

    impl CdcRecord for StopSellRecord {
        fn natural_key(&self) -> String {
            format!("{}|{}|{}|{}", self.forecast_date, self.facility_id, self.product_id, self.enjoy_by_date)
        }

        fn table_name() -> &'static str {
            "stop_sell"
        }
    }

    impl CdcRecord for HarvestUnallocatedRecord {
        fn natural_key(&self) -> String {
            format!("{}|{}|{}", self.date, self.facility_id, self.crop_id)
        }

        fn table_name() -> &'static str {
            "harvest_unallocated"
        }
    }

    impl CdcRecord for HarvestLedgerSnapshotRecord {
        fn natural_key(&self) -> String {
            format!("{}|{}|{}", self.date, self.crop_id, self.facility_id)
        }

        fn table_name() -> &'static str {
            "harvest_allocated_ledger"
        }
    }

    impl CdcRecord for CalculatedTransferRecord {
        fn natural_key(&self) -> String {
            format!(
                "{}|{}|{}|{}|{}|{}",
                self.ship_date, self.ship_facility_id, self.arrival_facility_id, self.route_id, self.product_id, self.truck_index,
            )
        }

        fn table_name() -> &'static str {
            "calculated_transfer"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::audit::CdcRecord;

    fn line() -> DemandLine {
        DemandLine {
            demand_date: NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            allocation_date: NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            facility_id: 3,
            product_id: 1,
            customer_id: 1,
            demand_qty: 100,
            rollover_qty: 0,
            safety_stock_qty: 0,
            fill_goal: 1.0,
            production_priority: 2,
        }
    }

    #[test]
    fn effective_demand_subtracts_roll_and_safety() {
        let mut l = line();
        l.rollover_qty = 10;
        l.safety_stock_qty = 5;
        assert_eq!(l.effective_demand(), 85);
    }

    #[test]
    fn scaled_and_complement_sum_to_original() {
        let l = line();
        let scaled = l.scaled_to_fill_goal(0.6);
        let complement = l.complement_of_fill_goal(0.6);
        assert_eq!(scaled.demand_qty + complement.demand_qty, l.demand_qty);
    }

    #[test]
    fn lot_with_zero_qty_is_absent() {
        let lot = InventoryLot {
            facility_id: 3,
            product_id: 1,
            enjoy_by_date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
            qty: 0,
        };
        assert!(!lot.is_present());
    }

    #[test]
    fn inventory_allocation_natural_key_distinguishes_no_customer() {
        let mut row = InventoryAllocationRecord {
            forecast_date: NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            facility_id: 3,
            product_id: 1,
            enjoy_by_date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
            customer_id: None,
            start_of_day_qty: 100,
            allocated_qty: 40,
            end_of_day_qty: 60,
            tier: 1,
        };
        let unattributed_key = row.natural_key();
        row.customer_id = Some(7);
        let attributed_key = row.natural_key();
        assert_ne!(unattributed_key, attributed_key);
        assert!(unattributed_key.ends_with("null"));
        assert!(attributed_key.ends_with('7'));
    }

    #[test]
    fn harvest_ledger_snapshot_table_name_distinct_from_customer_allocation() {
        assert_ne!(HarvestLedgerSnapshotRecord::table_name(), HarvestAllocationRecord::table_name());
        assert_eq!(HarvestLedgerSnapshotRecord::table_name(), "harvest_allocated_ledger");
        assert_eq!(HarvestAllocationRecord::table_name(), "customer_harvest_allocation");
    }
}
