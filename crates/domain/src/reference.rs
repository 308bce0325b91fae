//! Reference dimensions: facilities, crops, products, customers, routes, calendar.
//!
//! Pure data. No behavior beyond simple derived accessors; the yield and
//! allocation logic that consumes these types lives in `allocation-engine-lib`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub type FacilityId = i32;
pub type CropId = i32;
pub type ProductId = i32;
pub type CustomerId = i32;
pub type RouteId = i32;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Facility {
    pub id: FacilityId,
    pub city_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Facility {
    /// Coarse UTC offset derived from longitude (15 degrees per hour),
    /// used by the driver preamble to log each facility's local run time.
    /// Not used by any allocation math — allocation dates are calendar
    /// dates, not timestamps.
    pub fn utc_offset_hours(&self) -> i32 {
        (self.longitude / 15.0).round().clamp(-12.0, 14.0) as i32
    }
}

/// Facilities sharing a city code allocate as one region. A handful of ids
/// are canonicalized explicitly because their city codes alias a larger hub.
pub fn canonical_facility(facility_id: FacilityId) -> FacilityId {
    match facility_id {
        1 | 2 | 9 => 3,
        4 => 7,
        other => other,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FacilityLine {
    pub id: i32,
    pub facility_id: FacilityId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Crop {
    pub id: CropId,
    pub grams_per_unit: f64,
}

/// Default grams-per-retail-unit used when a crop dimension row carries no
/// explicit override.
pub fn default_grams_per_unit(crop_id: CropId) -> f64 {
    match crop_id {
        1 => 114.0,
        3 => 35.4,
        _ => 128.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "production_priority", rename_all = "snake_case")]
pub enum ProductionPriority {
    Retail1 = 1,
    Retail2 = 2,
    Retail3 = 3,
    Retail4 = 4,
    FoodService = 5,
    OutOfScope = 6,
}

impl ProductionPriority {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Retail1),
            2 => Some(Self::Retail2),
            3 => Some(Self::Retail3),
            4 => Some(Self::Retail4),
            5 => Some(Self::FoodService),
            6 => Some(Self::OutOfScope),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_food_service(self) -> bool {
        matches!(self, Self::FoodService)
    }

    pub fn is_in_scope(self) -> bool {
        !matches!(self, Self::OutOfScope)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub crop_id: CropId,
    pub net_weight_g: f64,
    pub whole: bool,
    pub shelf_life_guarantee_days: i64,
    pub total_shelf_life_days: i64,
    pub production_priority: i32,
    pub lead_time_days: i64,
    pub case_equivalent_multiplier: f64,
    pub cases_per_pallet: f64,
}

impl Product {
    pub fn priority(&self) -> Option<ProductionPriority> {
        ProductionPriority::from_i32(self.production_priority)
    }

    pub fn shelf_life_guarantee_date(&self, enjoy_by_date: NaiveDate) -> NaiveDate {
        enjoy_by_date - chrono::Duration::days(self.shelf_life_guarantee_days)
    }

    pub fn pallets_for(&self, qty: i64) -> f64 {
        (qty as f64 * self.case_equivalent_multiplier) / self.cases_per_pallet
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub fill_goal: f64,
}

/// Sentinel customer id used for rollover (production-to-inventory) harvest
/// allocations that are not directed at a specific customer.
pub const ROLLOVER_CUSTOMER_ID: CustomerId = 0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RouteConstraint {
    pub id: RouteId,
    pub ship_facility: FacilityId,
    pub arrival_facility: FacilityId,
    pub ship_day_of_week: i32,
    pub pack_lead_time_days: i64,
    pub transit_days: i64,
    pub max_pallet_capacity: f64,
    pub food_service_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HarvestForecastEntry {
    pub date: NaiveDate,
    pub facility_id: FacilityId,
    pub line_id: i32,
    pub crop_id: CropId,
    pub expected_plant_sites: f64,
    pub mean_headweight_g: f64,
    pub mean_loose_g_per_plant_site: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub year: i32,
    pub week: i32,
    pub day_of_week: i32,
}

/// Rewinds `days` calendar days from `from`, applying the Sunday-adjacent
/// rule: if the computed ship day lands on a Sunday, rewind by two days
/// instead of one additional day.
pub fn rewind_ship_day(from: NaiveDate, days: i64) -> NaiveDate {
    use chrono::Weekday;
    let candidate = from - chrono::Duration::days(days);
    if candidate.weekday() == Weekday::Sun {
        candidate - chrono::Duration::days(1)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_facility_hubs() {
        assert_eq!(canonical_facility(1), 3);
        assert_eq!(canonical_facility(2), 3);
        assert_eq!(canonical_facility(9), 3);
        assert_eq!(canonical_facility(4), 7);
        assert_eq!(canonical_facility(3), 3);
        assert_eq!(canonical_facility(7), 7);
        assert_eq!(canonical_facility(5), 5);
    }

    #[test]
    fn default_gpu_matches_crop_overrides() {
        assert_eq!(default_grams_per_unit(1), 114.0);
        assert_eq!(default_grams_per_unit(3), 35.4);
        assert_eq!(default_grams_per_unit(2), 128.0);
    }

    #[test]
    fn rewind_skips_an_extra_day_on_sunday() {
        // 2022-04-24 is a Sunday. Rewinding 1 day from 2022-04-25 lands on it.
        let from = NaiveDate::from_ymd_opt(2022, 4, 25).unwrap();
        let rewound = rewind_ship_day(from, 1);
        assert_eq!(rewound, NaiveDate::from_ymd_opt(2022, 4, 23).unwrap());
    }

    #[test]
    fn rewind_is_plain_subtraction_off_sunday() {
        let from = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let rewound = rewind_ship_day(from, 1);
        assert_eq!(rewound, NaiveDate::from_ymd_opt(2022, 4, 21).unwrap());
    }
}
