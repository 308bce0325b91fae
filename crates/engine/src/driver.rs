//! Outer tier x time driver (spec §4.8): walks the forecast horizon day by
//! day and, within each day, every fill-goal tier in descending order,
//! running components in the fixed order rollover -> stop-sell -> inventory
//! allocation -> harvest allocation -> prior-day allocation -> (pending pass
//! only) transfer planning. Each day runs a scaled sub-pass against every
//! tier's fill-goal share of demand followed by a complemented sub-pass
//! against the remainder, both writing into the same accumulators, before
//! the ledger rolls forward to the next day. A final sweep over the harvest
//! ledger emits the unallocated-plant-site rows once the whole horizon has
//! been walked.
//!
//! The baseline and pending passes are independent: each starts from the
//! same actual inventory position and demand, and differ only in that the
//! pending pass also runs the transfer planner per day and carries forward
//! its own ledger state (spec §6's baseline/pending table pair is two
//! complete, separately-computed runs, not one run split in two).

use allocation_domain::{
    CalculatedTransferRecord, Context, DemandLine, FacilityId, HarvestAllocationRecord,
    HarvestLedgerSnapshotRecord, HarvestUnallocatedRecord, InventoryAllocationRecord, InventoryLot,
    Pass, PlannedTransfer, ProductId, ShortDemandRecord, StopSellRecord,
};
use chrono::NaiveDate;

use crate::harvest_ledger::HarvestLedger;
use crate::harvest_unallocated;
use crate::inventory_ledger::InventoryLedger;
use crate::{harvest_allocator, inventory_allocator, prior_day_allocator, stop_sell, transfer_planner};

/// Everything the driver needs for one `run(forecast_date)` invocation: the
/// forecast horizon's allocation dates in chronological order, the actual
/// inventory position as of the first date, and the demand lines and
/// scheduled transfers spanning the whole horizon.
pub struct RunInputs {
    pub allocation_dates: Vec<NaiveDate>,
    pub inventory_actuals: Vec<InventoryLot>,
    pub demand_lines: Vec<DemandLine>,
    pub planned_transfers: Vec<PlannedTransfer>,
}

/// Every record family produced by one pass, ready to hand to the
/// persistence layer for the pass's table suffix.
#[derive(Debug, Default)]
pub struct PassOutput {
    pub inventory_allocations: Vec<InventoryAllocationRecord>,
    pub harvest_allocations: Vec<HarvestAllocationRecord>,
    pub short_demand: Vec<ShortDemandRecord>,
    pub stop_sell: Vec<StopSellRecord>,
    pub harvest_unallocated: Vec<HarvestUnallocatedRecord>,
    pub calculated_transfers: Vec<CalculatedTransferRecord>,
    pub harvest_ledger_snapshot: Vec<HarvestLedgerSnapshotRecord>,
}

/// Runs both the baseline and pending passes and returns `(baseline,
/// pending)`.
pub fn run(ctx: &Context, inputs: &RunInputs) -> (PassOutput, PassOutput) {
    let baseline = run_pass(ctx, inputs, Pass::Baseline);
    let pending = run_pass(ctx, inputs, Pass::Pending);
    (baseline, pending)
}

fn run_pass(ctx: &Context, inputs: &RunInputs, pass: Pass) -> PassOutput {
    let mut out = PassOutput::default();

    let tiers = distinct_fill_goals_descending(&inputs.demand_lines);

    let mut inventory_ledger = InventoryLedger::new();
    let mut harvest_ledger = HarvestLedger::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_day_rollover_harvest: Vec<(FacilityId, ProductId, i64)> = Vec::new();

    let total_shelf_life_days = |product_id: ProductId| ctx.product(product_id).map(|p| p.total_shelf_life_days);
    let is_food_service = |product_id: ProductId| {
        ctx.product(product_id)
            .map(|p| p.production_priority == 5)
            .unwrap_or(false)
    };

    for &date in &inputs.allocation_dates {
        match prev_date {
            None => {
                inventory_ledger = InventoryLedger::from_lots(inputs.inventory_actuals.clone());
            }
            Some(prev) => {
                inventory_ledger.retain_for_rollover(date, total_shelf_life_days, is_food_service);
                inventory_ledger.smooth_rollover(prev, &prev_day_rollover_harvest, total_shelf_life_days);
            }
        }
        harvest_ledger.seed_day(ctx, date);

        let mut day_rollover_harvest: Vec<(FacilityId, ProductId, i64)> = Vec::new();

        for &fill_goal in &tiers {
            run_tier_day(
                ctx,
                &mut inventory_ledger,
                &mut harvest_ledger,
                inputs,
                date,
                fill_goal,
                tier_index(&tiers, fill_goal),
                pass,
                DemandShare::Scaled,
                &mut out,
                &mut day_rollover_harvest,
            );
        }
        for &fill_goal in &tiers {
            run_tier_day(
                ctx,
                &mut inventory_ledger,
                &mut harvest_ledger,
                inputs,
                date,
                fill_goal,
                tier_index(&tiers, fill_goal),
                pass,
                DemandShare::Complement,
                &mut out,
                &mut day_rollover_harvest,
            );
        }

        prev_date = Some(date);
        prev_day_rollover_harvest = day_rollover_harvest;
    }

    out.harvest_unallocated = harvest_unallocated::write_unallocated(ctx, &harvest_ledger);
    out.harvest_ledger_snapshot = harvest_ledger
        .iter()
        .map(|(key, entry)| HarvestLedgerSnapshotRecord {
            date: key.date,
            crop_id: key.crop_id,
            facility_id: key.region,
            starting_plant_sites: entry.starting_plant_sites,
            allocated_plant_sites: entry.allocated_plant_sites,
            sealed: entry.sealed,
        })
        .collect();
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DemandShare {
    Scaled,
    Complement,
}

fn distinct_fill_goals_descending(demand_lines: &[DemandLine]) -> Vec<f64> {
    let mut goals: Vec<f64> = demand_lines.iter().map(|l| l.fill_goal).collect();
    goals.sort_by(|a, b| b.partial_cmp(a).unwrap());
    goals.dedup();
    goals
}

fn tier_index(tiers: &[f64], fill_goal: f64) -> u32 {
    tiers.iter().position(|&g| g == fill_goal).map(|i| i as u32 + 1).unwrap_or(1)
}

#[allow(clippy::too_many_arguments)]
fn run_tier_day(
    ctx: &Context,
    inventory_ledger: &mut InventoryLedger,
    harvest_ledger: &mut HarvestLedger,
    inputs: &RunInputs,
    date: NaiveDate,
    fill_goal: f64,
    tier: u32,
    pass: Pass,
    share: DemandShare,
    out: &mut PassOutput,
    day_rollover_harvest: &mut Vec<(FacilityId, ProductId, i64)>,
) {
    let tier_demand: Vec<DemandLine> = inputs
        .demand_lines
        .iter()
        .filter(|l| l.allocation_date == date && l.fill_goal == fill_goal)
        .map(|l| match share {
            DemandShare::Scaled => l.scaled_to_fill_goal(fill_goal),
            DemandShare::Complement => l.complement_of_fill_goal(fill_goal),
        })
        .collect();

    out.stop_sell
        .extend(stop_sell::project(ctx, inventory_ledger, date, tier, share, &inputs.planned_transfers));

    let inv_result = inventory_allocator::allocate(
        inventory_ledger,
        date,
        &tier_demand,
        &inputs.planned_transfers,
        tier,
        share,
    );
    out.inventory_allocations.extend(inv_result.allocations);

    let harvest_result = harvest_allocator::allocate(
        ctx,
        harvest_ledger,
        inv_result.short_demand,
        &tier_demand,
        inventory_ledger,
        date,
        tier,
        share,
        &inputs.planned_transfers,
    );
    out.harvest_allocations.extend(harvest_result.harvest_allocations);
    day_rollover_harvest.extend(harvest_result.rollover_harvest);

    let prior_day_result = prior_day_allocator::allocate(ctx, harvest_ledger, harvest_result.residual_short_demand, tier);
    out.harvest_allocations.extend(prior_day_result.harvest_allocations);

    let residual = if pass.runs_transfer_planning() {
        let transfer_result = transfer_planner::plan(
            ctx,
            inventory_ledger,
            harvest_ledger,
            prior_day_result.residual_short_demand,
            date,
        );
        out.inventory_allocations.extend(transfer_result.inventory_allocations);
        out.harvest_allocations.extend(transfer_result.harvest_allocations);
        out.calculated_transfers.extend(transfer_result.calculated_transfers);
        transfer_result.residual_short_demand
    } else {
        prior_day_result.residual_short_demand
    };

    out.short_demand.extend(residual);
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::{HarvestForecastEntry, Product};

    fn product(id: ProductId, crop_id: i32, net_weight_g: f64) -> Product {
        Product {
            id,
            crop_id,
            net_weight_g,
            whole: false,
            shelf_life_guarantee_days: 5,
            total_shelf_life_days: 20,
            production_priority: 2,
            lead_time_days: 0,
            case_equivalent_multiplier: 1.0,
            cases_per_pallet: 1.0,
        }
    }

    #[test]
    fn single_day_two_tier_run_allocates_higher_fill_goal_first() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let p = product(1, 10, 100.0);
        let ctx = Context::new(
            date,
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![p],
            vec![],
            vec![],
            vec![HarvestForecastEntry {
                date,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 1000.0,
                mean_headweight_g: 0.0,
                mean_loose_g_per_plant_site: 100.0,
            }],
            vec![],
        );

        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let inputs = RunInputs {
            allocation_dates: vec![date],
            inventory_actuals: vec![InventoryLot {
                facility_id: 3,
                product_id: 1,
                enjoy_by_date: enjoy_by,
                qty: 60,
            }],
            demand_lines: vec![
                DemandLine {
                    demand_date: date,
                    allocation_date: date,
                    facility_id: 3,
                    product_id: 1,
                    customer_id: 1,
                    demand_qty: 50,
                    rollover_qty: 0,
                    safety_stock_qty: 0,
                    fill_goal: 1.0,
                    production_priority: 2,
                },
                DemandLine {
                    demand_date: date,
                    allocation_date: date,
                    facility_id: 3,
                    product_id: 1,
                    customer_id: 2,
                    demand_qty: 50,
                    rollover_qty: 0,
                    safety_stock_qty: 0,
                    fill_goal: 0.5,
                    production_priority: 2,
                },
            ],
            planned_transfers: vec![],
        };

        let (baseline, _pending) = run(&ctx, &inputs);
        let customer_1_qty: i64 = baseline
            .inventory_allocations
            .iter()
            .filter(|a| a.customer_id == Some(1))
            .map(|a| a.allocated_qty)
            .sum();
        assert_eq!(customer_1_qty, 50);
    }

    #[test]
    fn harvest_unallocated_emitted_once_at_end_of_pass() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let ctx = Context::new(
            date,
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![HarvestForecastEntry {
                date,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 500.0,
                mean_headweight_g: 0.0,
                mean_loose_g_per_plant_site: 100.0,
            }],
            vec![],
        );
        let inputs = RunInputs {
            allocation_dates: vec![date],
            inventory_actuals: vec![],
            demand_lines: vec![],
            planned_transfers: vec![],
        };
        let (baseline, pending) = run(&ctx, &inputs);
        assert_eq!(baseline.harvest_unallocated.len(), 1);
        assert_eq!(baseline.harvest_unallocated[0].plant_sites, 500.0);
        assert_eq!(pending.harvest_unallocated.len(), 1);
    }
}
