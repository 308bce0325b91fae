//! Harvest → demand allocator (spec §4.4): converts residual short demand
//! into plant-site requests against the harvest ledger, enforcing
//! proportional short-fill and emitting full-pack-out flags.

use allocation_domain::{
    canonical_facility, rewind_ship_day, Context, CustomerId, DemandLine, FacilityId,
    HarvestAllocationRecord, HarvestKey, PlannedTransfer, PriorityScopeKey, ProductId,
    ShortDemandRecord, ROLLOVER_CUSTOMER_ID,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::warn;

use crate::driver::DemandShare;
use crate::harvest_ledger::HarvestLedger;
use crate::inventory_ledger::InventoryLedger;
use crate::yield_converter::{mean_gpps, plant_sites_needed, qty_from_plant_sites};

#[derive(Debug, Default)]
pub struct HarvestAllocationOutput {
    pub harvest_allocations: Vec<HarvestAllocationRecord>,
    pub residual_short_demand: Vec<ShortDemandRecord>,
    /// `(facility, product, qty)` manufactured by today's rollover pass, fed
    /// into tomorrow's `InventoryLedger::smooth_rollover`.
    pub rollover_harvest: Vec<(FacilityId, ProductId, i64)>,
}

#[allow(clippy::too_many_arguments)]
pub fn allocate(
    ctx: &Context,
    ledger: &mut HarvestLedger,
    short_demand: Vec<ShortDemandRecord>,
    demand_lines: &[DemandLine],
    inventory_ledger: &InventoryLedger,
    forecast_date: NaiveDate,
    tier: u32,
    share: DemandShare,
    planned_transfers: &[PlannedTransfer],
) -> HarvestAllocationOutput {
    let mut out = HarvestAllocationOutput::default();

    if tier == 1 && share == DemandShare::Scaled {
        out.harvest_allocations
            .extend(tier_one_pre_step(ctx, ledger, forecast_date, planned_transfers));
    }

    let mut remaining = short_demand;

    for priority in 1..=5 {
        let (scope_entries, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|d| d.production_priority == priority);
        remaining = rest;

        let mut groups: HashMap<PriorityScopeKey, Vec<ShortDemandRecord>> = HashMap::new();
        for entry in scope_entries {
            let Some(product) = ctx.product(entry.product_id) else {
                warn!(product_id = entry.product_id, "unknown reference id: product, skipping demand line");
                continue;
            };
            let region = canonical_facility(entry.facility_id);
            let effective_date = if priority == 5 {
                entry.allocation_date - chrono::Duration::days(product.lead_time_days)
            } else {
                entry.allocation_date
            };
            let key = PriorityScopeKey::new(effective_date, product.crop_id, region, priority);
            groups.entry(key).or_default().push(entry);
        }

        for (scope, entries) in groups {
            let harvest_key = HarvestKey::new(scope.date, scope.crop_id, scope.region);

            if ledger.is_sealed(&harvest_key) {
                remaining.extend(entries);
                continue;
            }

            let mut per_entry: Vec<(i64, f64)> = Vec::with_capacity(entries.len());
            let mut total_ps = 0.0;
            for entry in &entries {
                let product = ctx.product(entry.product_id).expect("filtered above");
                let gpps = mean_gpps(ctx, scope.date, scope.crop_id, scope.region, product.whole);
                if gpps <= 0.0 {
                    warn!(
                        date = %scope.date, crop_id = scope.crop_id, facility_id = scope.region,
                        "missing-yield: zero gpps for harvest key"
                    );
                }
                let ps = plant_sites_needed(entry.remaining_qty, product.net_weight_g, gpps);
                per_entry.push((ps, gpps));
                total_ps += ps as f64;
            }

            let available = ledger.available(&harvest_key);

            if total_ps <= 0.0 {
                // every line resolved to zero plant sites (missing yield); re-emit as short.
                remaining.extend(entries);
                continue;
            }

            if available >= total_ps {
                for (entry, (ps, gpps)) in entries.into_iter().zip(per_entry) {
                    ledger.allocate(harvest_key, ps as f64);
                    out.harvest_allocations.push(HarvestAllocationRecord {
                        allocation_date: scope.date,
                        demand_date: entry.demand_date,
                        harvest_facility_id: scope.region,
                        demand_facility_id: entry.facility_id,
                        crop_id: scope.crop_id,
                        product_id: entry.product_id,
                        customer_id: entry.customer_id,
                        forecasted_gpps: gpps,
                        allocated_plant_sites: ps as f64,
                        allocated_grams: ps as f64 * gpps,
                        allocated_qty: entry.remaining_qty,
                        full_packout: false,
                        tier,
                    });
                }
            } else {
                let ratio = available / total_ps;
                ledger.seal(harvest_key);
                for (entry, (_ps, gpps)) in entries.into_iter().zip(per_entry) {
                    let product = ctx.product(entry.product_id).expect("filtered above");
                    let allocated_qty = ((entry.remaining_qty as f64) * ratio).floor() as i64;
                    let allocated_ps = plant_sites_needed(allocated_qty, product.net_weight_g, gpps);
                    if allocated_qty > 0 {
                        ledger.allocate(harvest_key, allocated_ps as f64);
                        out.harvest_allocations.push(HarvestAllocationRecord {
                            allocation_date: scope.date,
                            demand_date: entry.demand_date,
                            harvest_facility_id: scope.region,
                            demand_facility_id: entry.facility_id,
                            crop_id: scope.crop_id,
                            product_id: entry.product_id,
                            customer_id: entry.customer_id,
                            forecasted_gpps: gpps,
                            allocated_plant_sites: allocated_ps as f64,
                            allocated_grams: allocated_ps as f64 * gpps,
                            allocated_qty,
                            full_packout: true,
                            tier,
                        });
                    }
                    let unfilled = entry.remaining_qty - allocated_qty;
                    if unfilled > 0 {
                        remaining.push(ShortDemandRecord {
                            remaining_qty: unfilled,
                            ..entry
                        });
                    }
                }
            }
        }

        apply_rollover(
            ctx,
            ledger,
            demand_lines,
            inventory_ledger,
            priority,
            forecast_date,
            tier,
            &mut out.harvest_allocations,
            &mut out.rollover_harvest,
        );
    }

    out.residual_short_demand = remaining;
    out
}

fn tier_one_pre_step(
    ctx: &Context,
    ledger: &mut HarvestLedger,
    forecast_date: NaiveDate,
    planned_transfers: &[PlannedTransfer],
) -> Vec<HarvestAllocationRecord> {
    let ship_day = rewind_ship_day(forecast_date, 1);
    let mut records = Vec::new();

    for transfer in planned_transfers.iter().filter(|t| t.ship_date == ship_day) {
        let Some(product) = ctx.product(transfer.product_id) else {
            warn!(product_id = transfer.product_id, "unknown reference id: product, skipping scheduled outbound transfer");
            continue;
        };
        let region = canonical_facility(transfer.ship_facility_id);
        let key = HarvestKey::new(ship_day, product.crop_id, region);

        if ledger.get(&key).map(|e| e.starting_plant_sites).unwrap_or(0.0) <= 0.0 {
            warn!(date = %ship_day, crop_id = product.crop_id, facility_id = region, "no harvest for scheduled outbound transfer key, skipping");
            continue;
        }

        let gpps = mean_gpps(ctx, ship_day, product.crop_id, region, product.whole);
        let net_ps = plant_sites_needed(transfer.qty, product.net_weight_g, gpps);
        let available = ledger.available(&key);
        let customer_id: CustomerId = ROLLOVER_CUSTOMER_ID;

        if available >= net_ps as f64 {
            ledger.allocate(key, net_ps as f64);
            records.push(HarvestAllocationRecord {
                allocation_date: ship_day,
                demand_date: ship_day,
                harvest_facility_id: region,
                demand_facility_id: transfer.arrival_facility_id,
                crop_id: product.crop_id,
                product_id: transfer.product_id,
                customer_id,
                forecasted_gpps: gpps,
                allocated_plant_sites: net_ps as f64,
                allocated_grams: net_ps as f64 * gpps,
                allocated_qty: transfer.qty,
                full_packout: false,
                tier: 1,
            });
        } else {
            ledger.allocate(key, available);
            ledger.seal(key);
            let allocated_qty = qty_from_plant_sites(available, gpps, product.net_weight_g);
            records.push(HarvestAllocationRecord {
                allocation_date: ship_day,
                demand_date: ship_day,
                harvest_facility_id: region,
                demand_facility_id: transfer.arrival_facility_id,
                crop_id: product.crop_id,
                product_id: transfer.product_id,
                customer_id,
                forecasted_gpps: gpps,
                allocated_plant_sites: available,
                allocated_grams: available * gpps,
                allocated_qty,
                full_packout: true,
                tier: 1,
            });
        }
    }

    records
}

/// Rollover demand: per-priority plant-site requests for product carried
/// over to tomorrow's inventory, covering both rollover and safety-stock
/// qty (the "roll budget" withheld from the inventory allocator's
/// effective-demand computation). Lines sharing a harvest key scale
/// proportionally when the key runs short.
#[allow(clippy::too_many_arguments)]
fn apply_rollover(
    ctx: &Context,
    ledger: &mut HarvestLedger,
    demand_lines: &[DemandLine],
    inventory_ledger: &InventoryLedger,
    priority: i32,
    forecast_date: NaiveDate,
    tier: u32,
    out: &mut Vec<HarvestAllocationRecord>,
    rollover_out: &mut Vec<(FacilityId, ProductId, i64)>,
) {
    let mut rollover_by_fp: HashMap<(FacilityId, ProductId), i64> = HashMap::new();
    for line in demand_lines.iter().filter(|l| {
        l.production_priority == priority
            && l.allocation_date == forecast_date
            && (l.rollover_qty > 0 || l.safety_stock_qty > 0)
    }) {
        *rollover_by_fp.entry((line.facility_id, line.product_id)).or_insert(0) +=
            line.rollover_qty + line.safety_stock_qty;
    }
    if rollover_by_fp.is_empty() {
        return;
    }

    struct PendingRollover {
        facility_id: FacilityId,
        product_id: ProductId,
        remaining_ps: f64,
        gpps: f64,
    }

    let mut by_key: HashMap<HarvestKey, Vec<PendingRollover>> = HashMap::new();
    for ((facility_id, product_id), rollover_qty) in rollover_by_fp {
        let Some(product) = ctx.product(product_id) else { continue };
        let region = canonical_facility(facility_id);
        let gpps = mean_gpps(ctx, forecast_date, product.crop_id, region, product.whole);
        let demand_ps = plant_sites_needed(rollover_qty, product.net_weight_g, gpps);

        let unallocated_qty: i64 = inventory_ledger
            .all()
            .filter(|lot| lot.facility_id == facility_id && lot.product_id == product_id)
            .map(|lot| lot.qty)
            .sum();
        let unallocated_ps = plant_sites_needed(unallocated_qty, product.net_weight_g, gpps);
        let remaining_ps = (demand_ps - unallocated_ps).max(0) as f64;
        if remaining_ps <= 0.0 {
            continue;
        }
        let key = HarvestKey::new(forecast_date, product.crop_id, region);
        by_key.entry(key).or_default().push(PendingRollover {
            facility_id,
            product_id,
            remaining_ps,
            gpps,
        });
    }

    for (key, pending) in by_key {
        if ledger.is_sealed(&key) {
            continue;
        }
        let total_ps: f64 = pending.iter().map(|p| p.remaining_ps).sum();
        if total_ps <= 0.0 {
            continue;
        }
        let available = ledger.available(&key);
        let ratio = (available / total_ps).min(1.0);

        for p in pending {
            let granted_ps = (p.remaining_ps * ratio).floor();
            if granted_ps <= 0.0 {
                continue;
            }
            let granted_qty = qty_from_plant_sites(granted_ps, p.gpps, ctx.product(p.product_id).unwrap().net_weight_g);
            if granted_qty <= 0 {
                continue;
            }
            ledger.allocate(key, granted_ps);
            out.push(HarvestAllocationRecord {
                allocation_date: forecast_date,
                demand_date: forecast_date,
                harvest_facility_id: key.region,
                demand_facility_id: p.facility_id,
                crop_id: key.crop_id,
                product_id: p.product_id,
                customer_id: ROLLOVER_CUSTOMER_ID,
                forecasted_gpps: p.gpps,
                allocated_plant_sites: granted_ps,
                allocated_grams: granted_ps * p.gpps,
                allocated_qty: granted_qty,
                full_packout: ratio < 1.0,
                tier,
            });
            rollover_out.push((p.facility_id, p.product_id, granted_qty));
        }
        if ratio < 1.0 {
            ledger.seal(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::{HarvestForecastEntry, Product};

    fn ctx_with(products: Vec<Product>, harvest: Vec<HarvestForecastEntry>) -> Context {
        Context::new(
            NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            products,
            vec![],
            vec![],
            harvest,
            vec![],
        )
    }

    fn product(id: ProductId, crop_id: i32, net_weight_g: f64, priority: i32, lead_time: i64, whole: bool) -> Product {
        Product {
            id,
            crop_id,
            net_weight_g,
            whole,
            shelf_life_guarantee_days: 5,
            total_shelf_life_days: 20,
            production_priority: priority,
            lead_time_days: lead_time,
            case_equivalent_multiplier: 1.0,
            cases_per_pallet: 1.0,
        }
    }

    fn short(demand_date: NaiveDate, facility_id: FacilityId, product_id: ProductId, customer_id: CustomerId, qty: i64, priority: i32) -> ShortDemandRecord {
        ShortDemandRecord {
            demand_date,
            allocation_date: demand_date,
            facility_id,
            product_id,
            customer_id,
            remaining_qty: qty,
            production_priority: priority,
        }
    }

    #[test]
    fn scenario_proportional_short_fill() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let p1 = product(1, 10, 100.0, 2, 0, false);
        let p2 = product(2, 10, 100.0, 2, 0, false);
        let ctx = ctx_with(
            vec![p1, p2],
            vec![HarvestForecastEntry {
                date,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 150.0,
                mean_headweight_g: 0.0,
                mean_loose_g_per_plant_site: 100.0,
            }],
        );
        let mut ledger = HarvestLedger::seed_from_forecast(&ctx, date);
        let short_demand = vec![short(date, 3, 1, 1, 100, 2), short(date, 3, 2, 2, 100, 2)];
        let inventory_ledger = InventoryLedger::new();
        let out = allocate(&ctx, &mut ledger, short_demand, &[], &inventory_ledger, date, 1, DemandShare::Scaled, &[]);

        assert_eq!(out.harvest_allocations.len(), 2);
        for record in &out.harvest_allocations {
            assert!(record.full_packout);
            assert_eq!(record.allocated_qty, 75);
        }
        assert_eq!(out.residual_short_demand.len(), 2);
        for r in &out.residual_short_demand {
            assert_eq!(r.remaining_qty, 25);
        }
    }

    #[test]
    fn scenario_food_service_lead_time_shifts_key() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let shifted = NaiveDate::from_ymd_opt(2022, 4, 20).unwrap();
        let p = product(1, 10, 100.0, 5, 2, false);
        let ctx = ctx_with(
            vec![p],
            vec![HarvestForecastEntry {
                date: shifted,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 100.0,
                mean_headweight_g: 0.0,
                mean_loose_g_per_plant_site: 100.0,
            }],
        );
        let mut ledger = HarvestLedger::seed_from_forecast(&ctx, shifted);
        let short_demand = vec![short(date, 3, 1, 1, 50, 5)];
        let inventory_ledger = InventoryLedger::new();
        let out = allocate(&ctx, &mut ledger, short_demand, &[], &inventory_ledger, date, 1, DemandShare::Scaled, &[]);
        assert_eq!(out.harvest_allocations.len(), 1);
        assert_eq!(out.harvest_allocations[0].allocation_date, shifted);
    }

    #[test]
    fn sealed_key_re_emits_demand_as_short() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let p = product(1, 10, 100.0, 2, 0, false);
        let ctx = ctx_with(vec![p], vec![]);
        let mut ledger = HarvestLedger::new();
        ledger.entry(HarvestKey::new(date, 10, 3)).starting_plant_sites = 100.0;
        ledger.seal(HarvestKey::new(date, 10, 3));
        let short_demand = vec![short(date, 3, 1, 1, 10, 2)];
        let inventory_ledger = InventoryLedger::new();
        let out = allocate(&ctx, &mut ledger, short_demand, &[], &inventory_ledger, date, 1, DemandShare::Scaled, &[]);
        assert!(out.harvest_allocations.is_empty());
        assert_eq!(out.residual_short_demand.len(), 1);
    }
}
