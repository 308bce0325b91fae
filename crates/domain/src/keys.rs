//! Typed composite keys, replacing the stringly-typed `"YYYY-MM-DD_crop_facility"`
//! concatenation with value types usable directly as map keys.

use crate::reference::{CropId, CustomerId, FacilityId, ProductId};
use chrono::NaiveDate;

/// Identifies a harvest-ledger entry: a day's plant-site availability for a
/// crop at a (canonicalized) region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HarvestKey {
    pub date: NaiveDate,
    pub crop_id: CropId,
    pub region: FacilityId,
}

impl HarvestKey {
    pub fn new(date: NaiveDate, crop_id: CropId, region: FacilityId) -> Self {
        Self {
            date,
            crop_id,
            region,
        }
    }
}

/// Identifies an inventory lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LotKey {
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub enjoy_by_date: NaiveDate,
}

impl LotKey {
    pub fn new(facility_id: FacilityId, product_id: ProductId, enjoy_by_date: NaiveDate) -> Self {
        Self {
            facility_id,
            product_id,
            enjoy_by_date,
        }
    }
}

/// Identifies a compacted short-demand line: `(demand-date, facility, product, customer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortDemandKey {
    pub demand_date: NaiveDate,
    pub facility_id: FacilityId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
}

impl ShortDemandKey {
    pub fn new(
        demand_date: NaiveDate,
        facility_id: FacilityId,
        product_id: ProductId,
        customer_id: CustomerId,
    ) -> Self {
        Self {
            demand_date,
            facility_id,
            product_id,
            customer_id,
        }
    }
}

/// Staging-map key used within a single priority pass of the harvest
/// allocator: `(date, product, facility, customer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StagingKey {
    pub date: NaiveDate,
    pub product_id: ProductId,
    pub facility_id: FacilityId,
    pub customer_id: CustomerId,
}

impl StagingKey {
    pub fn new(
        date: NaiveDate,
        product_id: ProductId,
        facility_id: FacilityId,
        customer_id: CustomerId,
    ) -> Self {
        Self {
            date,
            product_id,
            facility_id,
            customer_id,
        }
    }
}

/// Deduplication key for the transfer planner's harvest-transfer sweep:
/// `(short_key, harvest_date, ship_facility)` with an explicit separator
/// baked into the type itself rather than a concatenated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferSkipKey {
    pub short_key: ShortDemandKey,
    pub harvest_date: NaiveDate,
    pub ship_facility: FacilityId,
}

impl TransferSkipKey {
    pub fn new(short_key: ShortDemandKey, harvest_date: NaiveDate, ship_facility: FacilityId) -> Self {
        Self {
            short_key,
            harvest_date,
            ship_facility,
        }
    }
}

/// Groups candidate short-demand entries sharing a (date, crop, region,
/// priority) full-pack-out scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriorityScopeKey {
    pub date: NaiveDate,
    pub crop_id: CropId,
    pub region: FacilityId,
    pub priority: i32,
}

impl PriorityScopeKey {
    pub fn new(date: NaiveDate, crop_id: CropId, region: FacilityId, priority: i32) -> Self {
        Self {
            date,
            crop_id,
            region,
            priority,
        }
    }
}
