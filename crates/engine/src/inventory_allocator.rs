//! Inventory → demand allocator (spec §4.3): FEFO draw against one tier's
//! demand slice, plus the tier-1 planned-transfer outflow pre-step.

use allocation_domain::{
    canonical_facility, CustomerId, DemandLine, InventoryAllocationRecord, LotKey,
    PlannedTransfer, ShortDemandKey, ShortDemandRecord,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::warn;

use crate::driver::DemandShare;
use crate::inventory_ledger::InventoryLedger;

#[derive(Debug, Default)]
pub struct InventoryAllocationResult {
    pub allocations: Vec<InventoryAllocationRecord>,
    pub short_demand: Vec<ShortDemandRecord>,
}

/// Runs the inventory allocator for one tier's demand slice against
/// `forecast_date`. Mutates `ledger` in place; the caller must not retain
/// pre-call quantities.
#[allow(clippy::too_many_arguments)]
pub fn allocate(
    ledger: &mut InventoryLedger,
    forecast_date: NaiveDate,
    demand_lines: &[DemandLine],
    planned_transfers: &[PlannedTransfer],
    tier: u32,
    share: DemandShare,
) -> InventoryAllocationResult {
    let mut allocations = Vec::new();

    if tier == 1 && share == DemandShare::Scaled {
        run_planned_transfer_outflows(ledger, forecast_date, planned_transfers, &mut allocations);
    }

    let mut short_by_key: HashMap<ShortDemandKey, ShortDemandRecord> = HashMap::new();

    for line in demand_lines {
        if line.allocation_date != forecast_date {
            continue;
        }
        let effective_demand = line.effective_demand();
        if effective_demand <= 0 {
            continue;
        }

        let region = canonical_facility(line.facility_id);
        let candidates = ledger.fefo_candidates(line.product_id, region);

        let mut remaining = effective_demand;
        for key in candidates {
            if remaining <= 0 {
                break;
            }
            let lot = ledger.get(&key).expect("candidate key must exist");
            let start_qty = lot.qty;
            let drawn = ledger.draw(&key, remaining);
            if drawn <= 0 {
                continue;
            }
            remaining -= drawn;
            let end_qty = start_qty - drawn;
            allocations.push(InventoryAllocationRecord {
                forecast_date,
                facility_id: key.facility_id,
                product_id: key.product_id,
                enjoy_by_date: key.enjoy_by_date,
                customer_id: Some(line.customer_id),
                start_of_day_qty: start_qty,
                allocated_qty: drawn,
                end_of_day_qty: end_qty,
                tier,
            });
        }

        if remaining > 0 {
            let short_key = ShortDemandKey::new(
                line.demand_date,
                line.facility_id,
                line.product_id,
                line.customer_id,
            );
            short_by_key
                .entry(short_key)
                .and_modify(|record| record.remaining_qty += remaining)
                .or_insert(ShortDemandRecord {
                    demand_date: line.demand_date,
                    allocation_date: line.allocation_date,
                    facility_id: line.facility_id,
                    product_id: line.product_id,
                    customer_id: line.customer_id,
                    remaining_qty: remaining,
                    production_priority: line.production_priority,
                });
        }
    }

    InventoryAllocationResult {
        allocations,
        short_demand: short_by_key.into_values().collect(),
    }
}

fn run_planned_transfer_outflows(
    ledger: &mut InventoryLedger,
    forecast_date: NaiveDate,
    planned_transfers: &[PlannedTransfer],
    allocations: &mut Vec<InventoryAllocationRecord>,
) {
    for transfer in planned_transfers {
        if transfer.ship_date != forecast_date {
            continue;
        }
        let region = canonical_facility(transfer.ship_facility_id);
        let key = LotKey::new(region, transfer.product_id, transfer.enjoy_by_date);
        match ledger.get(&key) {
            None => {
                warn!(
                    product_id = transfer.product_id,
                    enjoy_by_date = %transfer.enjoy_by_date,
                    "planned-transfer shortfall: no matching inventory lot"
                );
            }
            Some(lot) => {
                let start_qty = lot.qty;
                let drawn = ledger.draw(&key, transfer.qty);
                if drawn < transfer.qty {
                    warn!(
                        product_id = transfer.product_id,
                        enjoy_by_date = %transfer.enjoy_by_date,
                        requested = transfer.qty,
                        available = start_qty,
                        "planned-transfer shortfall: insufficient inventory"
                    );
                }
                if drawn > 0 {
                    let customer_id: Option<CustomerId> = None;
                    allocations.push(InventoryAllocationRecord {
                        forecast_date,
                        facility_id: key.facility_id,
                        product_id: key.product_id,
                        enjoy_by_date: key.enjoy_by_date,
                        customer_id,
                        start_of_day_qty: start_qty,
                        allocated_qty: drawn,
                        end_of_day_qty: start_qty - drawn,
                        tier: 1,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(demand_qty: i64, rollover: i64, safety: i64) -> DemandLine {
        DemandLine {
            demand_date: NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            allocation_date: NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            facility_id: 3,
            product_id: 1,
            customer_id: 7,
            demand_qty,
            rollover_qty: rollover,
            safety_stock_qty: safety,
            fill_goal: 1.0,
            production_priority: 2,
        }
    }

    #[test]
    fn scenario_single_retail_demand_inventory_covers_it() {
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 100);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let demand = vec![line(40, 0, 0)];
        let result = allocate(&mut ledger, forecast_date, &demand, &[], 1, DemandShare::Scaled);
        assert_eq!(result.allocations.len(), 1);
        let record = &result.allocations[0];
        assert_eq!(record.start_of_day_qty, 100);
        assert_eq!(record.allocated_qty, 40);
        assert_eq!(record.end_of_day_qty, 60);
        assert_eq!(record.customer_id, Some(7));
        assert!(result.short_demand.is_empty());
    }

    #[test]
    fn fefo_draws_earliest_lot_first() {
        let mut ledger = InventoryLedger::new();
        let early = NaiveDate::from_ymd_opt(2022, 4, 30).unwrap();
        let late = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        ledger.merge_inbound(3, 1, late, 50);
        ledger.merge_inbound(3, 1, early, 20);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let demand = vec![line(30, 0, 0)];
        let result = allocate(&mut ledger, forecast_date, &demand, &[], 1, DemandShare::Scaled);
        assert_eq!(result.allocations[0].enjoy_by_date, early);
        assert_eq!(result.allocations[0].allocated_qty, 20);
        assert_eq!(result.allocations[1].enjoy_by_date, late);
        assert_eq!(result.allocations[1].allocated_qty, 10);
    }

    #[test]
    fn residual_demand_emitted_as_short() {
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 10);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let demand = vec![line(40, 0, 0)];
        let result = allocate(&mut ledger, forecast_date, &demand, &[], 1, DemandShare::Scaled);
        assert_eq!(result.short_demand.len(), 1);
        assert_eq!(result.short_demand[0].remaining_qty, 30);
    }

    #[test]
    fn non_positive_effective_demand_is_skipped() {
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 100);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let demand = vec![line(10, 5, 10)]; // effective = 10 - 5 - 10 = -5
        let result = allocate(&mut ledger, forecast_date, &demand, &[], 1, DemandShare::Scaled);
        assert!(result.allocations.is_empty());
        assert!(result.short_demand.is_empty());
    }

    #[test]
    fn scenario_tier_one_planned_transfer_debits_lot() {
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 50);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let transfer = PlannedTransfer {
            ship_date: forecast_date,
            arrival_date: forecast_date + chrono::Duration::days(1),
            ship_facility_id: 3,
            arrival_facility_id: 7,
            product_id: 1,
            enjoy_by_date: enjoy_by,
            qty: 30,
        };
        let result = allocate(&mut ledger, forecast_date, &[], &[transfer], 1, DemandShare::Scaled);
        assert_eq!(result.allocations.len(), 1);
        let record = &result.allocations[0];
        assert_eq!(record.customer_id, None);
        assert_eq!(record.allocated_qty, 30);
        assert_eq!(record.end_of_day_qty, 20);
    }
}
