//! Cross-facility transfer planner (spec §4.5): closes same-region
//! impossibilities by shipping between regions under a fixed weekly route
//! calendar and truck pallet-capacity constraint. Runs only in the pending
//! pass (spec §4.8 step 5).

use allocation_domain::{
    canonical_facility, CalculatedTransferRecord, Context, CropId, CustomerId, FacilityId,
    HarvestAllocationRecord, HarvestKey, InventoryAllocationRecord, ProductId, RouteConstraint,
    ShortDemandKey, ShortDemandRecord, TransferSkipKey,
};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};

use crate::harvest_ledger::HarvestLedger;
use crate::inventory_ledger::InventoryLedger;
use crate::yield_converter::{mean_gpps, plant_sites_needed};

#[derive(Debug, Default)]
pub struct TransferPlanResult {
    pub calculated_transfers: Vec<CalculatedTransferRecord>,
    pub harvest_allocations: Vec<HarvestAllocationRecord>,
    pub inventory_allocations: Vec<InventoryAllocationRecord>,
    pub residual_short_demand: Vec<ShortDemandRecord>,
}

/// Rewinds `transit_days` from `forecast_date` (applying the Sunday rule),
/// then aligns backward to the most recent occurrence of the route's
/// scheduled ship day-of-week.
fn resolve_ship_day(forecast_date: NaiveDate, route: &RouteConstraint) -> NaiveDate {
    let base = allocation_domain::rewind_ship_day(forecast_date, route.transit_days);
    let base_dow = weekday_index(base.weekday());
    let target_dow = route.ship_day_of_week % 7;
    let diff = (base_dow + 7 - target_dow) % 7;
    base - chrono::Duration::days(diff as i64)
}

fn weekday_index(weekday: Weekday) -> i32 {
    weekday.num_days_from_sunday() as i32
}

struct TruckBook {
    state: HashMap<(NaiveDate, FacilityId, FacilityId), (u32, f64)>,
}

impl TruckBook {
    fn new() -> Self {
        Self {
            state: HashMap::new(),
        }
    }

    fn assign(&mut self, ship_date: NaiveDate, ship: FacilityId, arrival: FacilityId, pallets: f64, max_capacity: f64) -> u32 {
        let entry = self.state.entry((ship_date, ship, arrival)).or_insert((1, 0.0));
        if entry.1 + pallets > max_capacity {
            entry.0 += 1;
            entry.1 = pallets;
        } else {
            entry.1 += pallets;
        }
        entry.0
    }
}

pub fn plan(
    ctx: &Context,
    inventory_ledger: &mut InventoryLedger,
    harvest_ledger: &mut HarvestLedger,
    short_demand: Vec<ShortDemandRecord>,
    forecast_date: NaiveDate,
) -> TransferPlanResult {
    let mut remaining: HashMap<ShortDemandKey, ShortDemandRecord> = short_demand
        .into_iter()
        .map(|d| (ShortDemandKey::new(d.demand_date, d.facility_id, d.product_id, d.customer_id), d))
        .collect();

    let mut result = TransferPlanResult::default();
    let mut trucks = TruckBook::new();
    let mut skip_keys: HashSet<TransferSkipKey> = HashSet::new();

    for route in ctx.routes() {
        let ship_day = resolve_ship_day(forecast_date, route);
        let ship_region = canonical_facility(route.ship_facility);
        let arrival_region = canonical_facility(route.arrival_facility);

        let mut matching_keys: Vec<ShortDemandKey> = remaining
            .keys()
            .filter(|k| canonical_facility(k.facility_id) == arrival_region)
            .copied()
            .collect();
        matching_keys.sort();

        if !route.food_service_only {
            plan_harvest_transfers(
                ctx,
                harvest_ledger,
                &mut remaining,
                &mut result,
                &mut trucks,
                &mut skip_keys,
                &matching_keys,
                route,
                ship_day,
                ship_region,
                arrival_region,
            );
            continue;
        }

        for short_key in matching_keys {
            let Some(entry) = remaining.get(&short_key) else { continue };
            let Some(product) = ctx.product(entry.product_id) else { continue };

            if product.production_priority != 5 || product.crop_id != 3 {
                continue;
            }
            let mut demand = remaining.get(&short_key).unwrap().remaining_qty;
            let candidates = inventory_ledger.fefo_candidates(entry.product_id, ship_region);
            for lot_key in candidates {
                if demand <= 0 {
                    break;
                }
                let Some(lot) = inventory_ledger.get(&lot_key) else { continue };
                let start_qty = lot.qty;
                let drawn = inventory_ledger.draw(&lot_key, demand);
                if drawn <= 0 {
                    continue;
                }
                demand -= drawn;
                result.inventory_allocations.push(InventoryAllocationRecord {
                    forecast_date,
                    facility_id: lot_key.facility_id,
                    product_id: lot_key.product_id,
                    enjoy_by_date: lot_key.enjoy_by_date,
                    customer_id: Some(entry.customer_id),
                    start_of_day_qty: start_qty,
                    allocated_qty: drawn,
                    end_of_day_qty: start_qty - drawn,
                    tier: 0,
                });
                let pallets = product.pallets_for(drawn);
                let truck_index = trucks.assign(ship_day, ship_region, arrival_region, pallets, route.max_pallet_capacity);
                result.calculated_transfers.push(CalculatedTransferRecord {
                    ship_date: ship_day,
                    arrival_date: ship_day + chrono::Duration::days(route.transit_days),
                    ship_facility_id: ship_region,
                    arrival_facility_id: arrival_region,
                    route_id: route.id,
                    product_id: lot_key.product_id,
                    enjoy_by_date: lot_key.enjoy_by_date,
                    customer_id: Some(entry.customer_id),
                    qty: drawn,
                    pallets,
                    truck_index,
                });
            }
            if let Some(e) = remaining.get_mut(&short_key) {
                e.remaining_qty = demand;
            }
        }
    }

    result.residual_short_demand = remaining.into_values().filter(|d| d.remaining_qty > 0).collect();
    result
}

struct PendingTransfer {
    short_key: ShortDemandKey,
    product_id: ProductId,
    customer_id: CustomerId,
    demand_date: NaiveDate,
    crop_id: CropId,
    window_start: NaiveDate,
    demand: i64,
}

/// Priority-2 (retail) harvest transfer sweep for one route: walks backward
/// from the route's last eligible harvest day, grouping short-demand entries
/// that compete for the same (day, crop, ship-region) harvest key and
/// applying the same ratio-based proportional fill as
/// `harvest_allocator::allocate`, rather than granting entries one at a time
/// in arbitrary order.
#[allow(clippy::too_many_arguments)]
fn plan_harvest_transfers(
    ctx: &Context,
    harvest_ledger: &mut HarvestLedger,
    remaining: &mut HashMap<ShortDemandKey, ShortDemandRecord>,
    result: &mut TransferPlanResult,
    trucks: &mut TruckBook,
    skip_keys: &mut HashSet<TransferSkipKey>,
    matching_keys: &[ShortDemandKey],
    route: &RouteConstraint,
    ship_day: NaiveDate,
    ship_region: FacilityId,
    arrival_region: FacilityId,
) {
    let mut pending: Vec<PendingTransfer> = Vec::new();
    for &short_key in matching_keys {
        let Some(entry) = remaining.get(&short_key) else { continue };
        let Some(product) = ctx.product(entry.product_id) else { continue };
        if product.production_priority != 2 {
            continue;
        }
        let window_start = entry.demand_date
            - chrono::Duration::days(product.total_shelf_life_days - product.shelf_life_guarantee_days);
        pending.push(PendingTransfer {
            short_key,
            product_id: entry.product_id,
            customer_id: entry.customer_id,
            demand_date: entry.demand_date,
            crop_id: product.crop_id,
            window_start,
            demand: entry.remaining_qty,
        });
    }
    if pending.is_empty() {
        return;
    }

    let last_harvest_day = ship_day - chrono::Duration::days(route.pack_lead_time_days);
    let min_window_start = pending.iter().map(|p| p.window_start).min().unwrap();

    let mut day = last_harvest_day;
    loop {
        let mut groups: HashMap<CropId, Vec<usize>> = HashMap::new();
        for (idx, p) in pending.iter().enumerate() {
            if p.demand <= 0 || day < p.window_start {
                continue;
            }
            let dedup_key = TransferSkipKey::new(p.short_key, day, ship_region);
            if skip_keys.contains(&dedup_key) {
                continue;
            }
            groups.entry(p.crop_id).or_default().push(idx);
        }

        let mut crop_ids: Vec<CropId> = groups.keys().copied().collect();
        crop_ids.sort();

        for crop_id in crop_ids {
            let indices = &groups[&crop_id];
            let harvest_key = HarvestKey::new(day, crop_id, ship_region);
            harvest_ledger.ensure_seeded(ctx, harvest_key);

            for &idx in indices {
                skip_keys.insert(TransferSkipKey::new(pending[idx].short_key, day, ship_region));
            }
            if harvest_ledger.is_sealed(&harvest_key) {
                continue;
            }

            let mut per_idx: Vec<(usize, i64, f64)> = Vec::with_capacity(indices.len());
            let mut total_ps = 0.0;
            for &idx in indices {
                let p = &pending[idx];
                let product = ctx.product(p.product_id).expect("filtered above");
                let gpps = mean_gpps(ctx, day, crop_id, ship_region, product.whole);
                let net_ps = plant_sites_needed(p.demand, product.net_weight_g, gpps);
                per_idx.push((idx, net_ps, gpps));
                total_ps += net_ps as f64;
            }
            if total_ps <= 0.0 {
                continue;
            }

            let available = harvest_ledger.available(&harvest_key);
            let ratio = (available / total_ps).min(1.0);

            for (idx, net_ps, gpps) in per_idx {
                if net_ps <= 0 {
                    continue;
                }
                let granted_ps = (net_ps as f64 * ratio).floor();
                if granted_ps <= 0.0 {
                    continue;
                }
                let product = ctx.product(pending[idx].product_id).expect("filtered above");
                let granted_qty = if gpps > 0.0 {
                    ((granted_ps * gpps) / product.net_weight_g).floor() as i64
                } else {
                    0
                };
                if granted_qty <= 0 {
                    continue;
                }
                harvest_ledger.allocate(harvest_key, granted_ps);
                let p = &pending[idx];
                result.harvest_allocations.push(HarvestAllocationRecord {
                    allocation_date: day,
                    demand_date: p.demand_date,
                    harvest_facility_id: ship_region,
                    demand_facility_id: arrival_region,
                    crop_id,
                    product_id: p.product_id,
                    customer_id: p.customer_id,
                    forecasted_gpps: gpps,
                    allocated_plant_sites: granted_ps,
                    allocated_grams: granted_ps * gpps,
                    allocated_qty: granted_qty,
                    full_packout: ratio < 1.0,
                    tier: 0,
                });
                let enjoy_by_date = day + chrono::Duration::days(product.total_shelf_life_days);
                let pallets = product.pallets_for(granted_qty);
                let truck_index = trucks.assign(ship_day, ship_region, arrival_region, pallets, route.max_pallet_capacity);
                result.calculated_transfers.push(CalculatedTransferRecord {
                    ship_date: ship_day,
                    arrival_date: ship_day + chrono::Duration::days(route.transit_days),
                    ship_facility_id: ship_region,
                    arrival_facility_id: arrival_region,
                    route_id: route.id,
                    product_id: p.product_id,
                    enjoy_by_date,
                    customer_id: Some(p.customer_id),
                    qty: granted_qty,
                    pallets,
                    truck_index,
                });
                pending[idx].demand -= granted_qty;
            }
            if ratio < 1.0 {
                harvest_ledger.seal(harvest_key);
            }
        }

        if day == min_window_start {
            break;
        }
        day -= chrono::Duration::days(1);
    }

    for p in pending {
        if let Some(e) = remaining.get_mut(&p.short_key) {
            e.remaining_qty = p.demand;
        }
    }
}
