//! Plant-site ↔ packed-unit conversion (spec §4.1), with a trailing-average
//! fallback for days whose harvest forecast carries zero plant sites.

use allocation_domain::{canonical_facility, Context, CropId, FacilityId};
use chrono::NaiveDate;

/// Default width of the trailing-average fallback window, in days.
pub const DEFAULT_TRAILING_WINDOW_DAYS: i64 = 14;

/// Plant-site-weighted mean of headweight (whole) or loose (non-whole)
/// grams per plant site, over every harvest-forecast entry sharing the
/// requested facility's region. Returns 0 if total plant sites is 0.
pub fn mean_gpps(ctx: &Context, date: NaiveDate, crop_id: CropId, facility_id: FacilityId, whole: bool) -> f64 {
    let region = canonical_facility(facility_id);
    let entries = ctx.harvest_forecast_for(date, crop_id, region);
    let total_ps: f64 = entries.iter().map(|e| e.expected_plant_sites).sum();
    if total_ps <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = entries
        .iter()
        .map(|e| {
            let per_site = if whole {
                e.mean_headweight_g
            } else {
                e.mean_loose_g_per_plant_site
            };
            per_site * e.expected_plant_sites
        })
        .sum();
    weighted / total_ps
}

/// `mean_gpps`, falling back to a trailing `window_days`-day average ending
/// the day before `date` when the requested day has zero plant sites.
/// Still returns 0 if the trailing window is also empty.
pub fn mean_gpps_with_fallback(
    ctx: &Context,
    date: NaiveDate,
    crop_id: CropId,
    facility_id: FacilityId,
    whole: bool,
    window_days: i64,
) -> f64 {
    let direct = mean_gpps(ctx, date, crop_id, facility_id, whole);
    if direct > 0.0 {
        return direct;
    }
    let region = canonical_facility(facility_id);
    let mut total_ps = 0.0;
    let mut weighted = 0.0;
    for offset in 1..=window_days {
        let day = date - chrono::Duration::days(offset);
        let entries = ctx.harvest_forecast_for(day, crop_id, region);
        for e in entries {
            let per_site = if whole {
                e.mean_headweight_g
            } else {
                e.mean_loose_g_per_plant_site
            };
            weighted += per_site * e.expected_plant_sites;
            total_ps += e.expected_plant_sites;
        }
    }
    if total_ps <= 0.0 {
        0.0
    } else {
        weighted / total_ps
    }
}

/// `ceil(qty * net_weight_g / gpps)` when `gpps > 0`, else 0.
pub fn plant_sites_needed(qty: i64, net_weight_g: f64, gpps: f64) -> i64 {
    if gpps <= 0.0 {
        return 0;
    }
    ((qty as f64 * net_weight_g) / gpps).ceil() as i64
}

/// `floor(ps * gpps / net_weight_g)`.
pub fn qty_from_plant_sites(plant_sites: f64, gpps: f64, net_weight_g: f64) -> i64 {
    if net_weight_g <= 0.0 {
        return 0;
    }
    ((plant_sites * gpps) / net_weight_g).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::{Context, HarvestForecastEntry};

    fn ctx_with_entries(entries: Vec<HarvestForecastEntry>) -> Context {
        Context::new(
            NaiveDate::from_ymd_opt(2022, 4, 22).unwrap(),
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            entries,
            vec![],
        )
    }

    #[test]
    fn mean_gpps_is_plant_site_weighted() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let ctx = ctx_with_entries(vec![
            HarvestForecastEntry {
                date,
                facility_id: 3,
                line_id: 1,
                crop_id: 10,
                expected_plant_sites: 150.0,
                mean_headweight_g: 200.0,
                mean_loose_g_per_plant_site: 100.0,
            },
            HarvestForecastEntry {
                date,
                facility_id: 3,
                line_id: 2,
                crop_id: 10,
                expected_plant_sites: 50.0,
                mean_headweight_g: 400.0,
                mean_loose_g_per_plant_site: 300.0,
            },
        ]);
        let result = mean_gpps(&ctx, date, 10, 3, false);
        assert!((result - 150.0).abs() < 1e-9);
    }

    #[test]
    fn mean_gpps_zero_plant_sites_returns_zero() {
        let date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let ctx = ctx_with_entries(vec![]);
        assert_eq!(mean_gpps(&ctx, date, 10, 3, false), 0.0);
    }

    #[test]
    fn fallback_finds_trailing_day_when_today_is_empty() {
        let today = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let yesterday = today - chrono::Duration::days(1);
        let ctx = ctx_with_entries(vec![HarvestForecastEntry {
            date: yesterday,
            facility_id: 3,
            line_id: 1,
            crop_id: 10,
            expected_plant_sites: 100.0,
            mean_headweight_g: 200.0,
            mean_loose_g_per_plant_site: 90.0,
        }]);
        let result = mean_gpps_with_fallback(&ctx, today, 10, 3, false, 14);
        assert!((result - 90.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_still_returns_zero_when_window_is_empty() {
        let today = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let ctx = ctx_with_entries(vec![]);
        assert_eq!(mean_gpps_with_fallback(&ctx, today, 10, 3, false, 14), 0.0);
    }

    #[test]
    fn plant_sites_needed_ceils() {
        assert_eq!(plant_sites_needed(100, 100.0, 150.0), 67);
        assert_eq!(plant_sites_needed(100, 0.0, 0.0), 0);
    }

    #[test]
    fn qty_from_plant_sites_floors() {
        assert_eq!(qty_from_plant_sites(150.0, 100.0, 100.0), 150);
        assert_eq!(qty_from_plant_sites(1.0, 99.0, 100.0), 0);
    }
}
