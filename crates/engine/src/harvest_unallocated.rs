//! Harvest-unallocated writer (spec §4.7): walks the harvest ledger at the
//! end of a pass and emits a record for every key with plant sites left
//! over.

use allocation_domain::{default_grams_per_unit, Context, HarvestUnallocatedRecord};

use crate::harvest_ledger::HarvestLedger;
use crate::yield_converter::mean_gpps;

/// Because the driver seeds every `(date, crop, region)` key implied by the
/// day's harvest forecast before any allocation runs, "no allocation at
/// all" and "remaining == starting" describe the same condition here, so a
/// single sweep over the ledger covers both spec bullets without emitting a
/// key twice.
pub fn write_unallocated(ctx: &Context, ledger: &HarvestLedger) -> Vec<HarvestUnallocatedRecord> {
    let mut records = Vec::new();
    for (key, entry) in ledger.iter() {
        let remaining = entry.starting_plant_sites - entry.allocated_plant_sites;
        if remaining <= 0.0 {
            continue;
        }
        let whole_gpps = mean_gpps(ctx, key.date, key.crop_id, key.region, true);
        let loose_gpps = mean_gpps(ctx, key.date, key.crop_id, key.region, false);
        let grams_per_unit = ctx.crop(key.crop_id).map(|c| c.grams_per_unit).unwrap_or_else(|| default_grams_per_unit(key.crop_id));
        let unit_qty = if grams_per_unit > 0.0 {
            ((remaining * loose_gpps) / grams_per_unit).floor() as i64
        } else {
            0
        };
        records.push(HarvestUnallocatedRecord {
            date: key.date,
            facility_id: key.region,
            crop_id: key.crop_id,
            plant_sites: remaining,
            whole_grams: remaining * whole_gpps,
            loose_grams: remaining * loose_gpps,
            unit_qty,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::HarvestKey;
    use chrono::NaiveDate;

    #[test]
    fn emits_record_for_key_with_plant_sites_remaining() {
        let ctx = Context::new(
            NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        let mut ledger = HarvestLedger::new();
        let key = HarvestKey::new(NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(), 1, 3);
        ledger.entry(key).starting_plant_sites = 100.0;
        ledger.allocate(key, 40.0);
        let records = write_unallocated(&ctx, &ledger);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plant_sites, 60.0);
    }

    #[test]
    fn fully_allocated_key_emits_nothing() {
        let ctx = Context::new(
            NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        let mut ledger = HarvestLedger::new();
        let key = HarvestKey::new(NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(), 1, 3);
        ledger.entry(key).starting_plant_sites = 100.0;
        ledger.allocate(key, 100.0);
        let records = write_unallocated(&ctx, &ledger);
        assert!(records.is_empty());
    }
}
