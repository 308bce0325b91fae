//! Prior-day harvest allocator (spec §4.4 continuation): a secondary pass
//! that reclaims earlier harvest days still within shelf life for retail
//! demand (priority 2) the forward pass could not satisfy.

use allocation_domain::{
    canonical_facility, Context, CropId, FacilityId, HarvestAllocationRecord, HarvestKey,
    ShortDemandRecord,
};
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::harvest_ledger::HarvestLedger;
use crate::yield_converter::{mean_gpps, plant_sites_needed};

pub struct PriorDayAllocationOutput {
    pub harvest_allocations: Vec<HarvestAllocationRecord>,
    pub residual_short_demand: Vec<ShortDemandRecord>,
}

struct Active {
    entry: ShortDemandRecord,
    region: FacilityId,
    crop_id: CropId,
    net_weight_g: f64,
    whole: bool,
    window_start: NaiveDate,
    window_end: NaiveDate,
}

/// Reclaims prior harvest days for retail short demand, walking backward
/// from the most recent eligible day to the oldest. Entries whose windows
/// overlap on the same day and harvest key compete for that day's
/// availability via the same ratio-based proportional fill
/// `harvest_allocator::allocate` uses, keyed deterministically by
/// `HarvestKey`'s natural ordering rather than hash order.
pub fn allocate(
    ctx: &Context,
    ledger: &mut HarvestLedger,
    short_demand: Vec<ShortDemandRecord>,
    tier: u32,
) -> PriorDayAllocationOutput {
    let mut harvest_allocations = Vec::new();
    let mut residual = Vec::new();
    let mut active: Vec<Active> = Vec::new();

    for entry in short_demand {
        if entry.production_priority != 2 {
            residual.push(entry);
            continue;
        }
        let Some(product) = ctx.product(entry.product_id) else {
            residual.push(entry);
            continue;
        };
        let region = canonical_facility(entry.facility_id);
        let window_start = entry.demand_date
            - chrono::Duration::days(product.total_shelf_life_days - product.shelf_life_guarantee_days);
        let window_end = entry.demand_date - chrono::Duration::days(1);
        active.push(Active {
            entry,
            region,
            crop_id: product.crop_id,
            net_weight_g: product.net_weight_g,
            whole: product.whole,
            window_start,
            window_end,
        });
    }

    if active.is_empty() {
        return PriorDayAllocationOutput {
            harvest_allocations,
            residual_short_demand: residual,
        };
    }

    let max_day = active.iter().map(|a| a.window_end).max().unwrap();
    let min_day = active.iter().map(|a| a.window_start).min().unwrap();

    let mut day = max_day;
    loop {
        let mut groups: HashMap<HarvestKey, Vec<usize>> = HashMap::new();
        for (idx, a) in active.iter().enumerate() {
            if a.entry.remaining_qty > 0 && day >= a.window_start && day <= a.window_end {
                let key = HarvestKey::new(day, a.crop_id, a.region);
                groups.entry(key).or_default().push(idx);
            }
        }

        let mut keys: Vec<HarvestKey> = groups.keys().copied().collect();
        keys.sort();

        for key in keys {
            ledger.ensure_seeded(ctx, key);
            if ledger.is_sealed(&key) {
                continue;
            }

            let indices = &groups[&key];
            let mut per_idx: Vec<(usize, i64, f64)> = Vec::with_capacity(indices.len());
            let mut total_ps = 0.0;
            for &idx in indices {
                let a = &active[idx];
                let gpps = mean_gpps(ctx, day, key.crop_id, key.region, a.whole);
                let net_ps = plant_sites_needed(a.entry.remaining_qty, a.net_weight_g, gpps);
                per_idx.push((idx, net_ps, gpps));
                total_ps += net_ps as f64;
            }
            if total_ps <= 0.0 {
                continue;
            }

            let available = ledger.available(&key);
            let ratio = (available / total_ps).min(1.0);

            for (idx, net_ps, gpps) in per_idx {
                if net_ps <= 0 {
                    continue;
                }
                let granted_ps = (net_ps as f64 * ratio).floor();
                if granted_ps <= 0.0 {
                    continue;
                }
                let granted_qty = if gpps > 0.0 {
                    ((granted_ps * gpps) / active[idx].net_weight_g).floor() as i64
                } else {
                    0
                };
                if granted_qty <= 0 {
                    continue;
                }
                ledger.allocate(key, granted_ps);
                let a = &mut active[idx];
                harvest_allocations.push(HarvestAllocationRecord {
                    allocation_date: day,
                    demand_date: a.entry.demand_date,
                    harvest_facility_id: a.region,
                    demand_facility_id: a.entry.facility_id,
                    crop_id: a.crop_id,
                    product_id: a.entry.product_id,
                    customer_id: a.entry.customer_id,
                    forecasted_gpps: gpps,
                    allocated_plant_sites: granted_ps,
                    allocated_grams: granted_ps * gpps,
                    allocated_qty: granted_qty,
                    full_packout: ratio < 1.0,
                    tier,
                });
                a.entry.remaining_qty -= granted_qty;
            }
            if ratio < 1.0 {
                ledger.seal(key);
            }
        }

        if day == min_day {
            break;
        }
        day -= chrono::Duration::days(1);
    }

    for a in active {
        if a.entry.remaining_qty > 0 {
            residual.push(a.entry);
        }
    }

    PriorDayAllocationOutput {
        harvest_allocations,
        residual_short_demand: residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::{HarvestForecastEntry, Product};
    use chrono::NaiveDate;

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

    #[test]
    fn reclaims_prior_harvest_day_within_window() {
        let demand_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let prior_day = demand_date - chrono::Duration::days(2);
        let product = Product {
            id: 1,
            crop_id: 10,
            net_weight_g: 100.0,
            whole: false,
            shelf_life_guarantee_days: 10,
            total_shelf_life_days: 20,
            production_priority: 2,
            lead_time_days: 0,
            case_equivalent_multiplier: 1.0,
            cases_per_pallet: 1.0,
        };
        let ctx = ctx_with(
            vec![product],
            vec![HarvestForecastEntry {
                date: prior_day,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 100.0,
                mean_headweight_g: 0.0,
                mean_loose_g_per_plant_site: 100.0,
            }],
        );
        let mut ledger = HarvestLedger::new();
        let short_demand = vec![ShortDemandRecord {
            demand_date,
            allocation_date: demand_date,
            facility_id: 3,
            product_id: 1,
            customer_id: 5,
            remaining_qty: 50,
            production_priority: 2,
        }];
        let out = allocate(&ctx, &mut ledger, short_demand, 1);
        assert_eq!(out.harvest_allocations.len(), 1);
        assert_eq!(out.harvest_allocations[0].allocation_date, prior_day);
        assert_eq!(out.harvest_allocations[0].allocated_qty, 50);
        assert!(out.residual_short_demand.is_empty());
    }

    #[test]
    fn non_retail_priority_passes_through_untouched() {
        let demand_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let ctx = ctx_with(vec![], vec![]);
        let mut ledger = HarvestLedger::new();
        let short_demand = vec![ShortDemandRecord {
            demand_date,
            allocation_date: demand_date,
            facility_id: 3,
            product_id: 1,
            customer_id: 5,
            remaining_qty: 50,
            production_priority: 5,
        }];
        let out = allocate(&ctx, &mut ledger, short_demand, 1);
        assert!(out.harvest_allocations.is_empty());
        assert_eq!(out.residual_short_demand.len(), 1);
    }
}
