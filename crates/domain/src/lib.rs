//! Typed domain for the daily supply-allocation engine: reference
//! dimensions, composite keys, fact/record types, and the run-scoped
//! `Context` the engine threads through every component.

pub mod context;
pub mod keys;
pub mod pass;
pub mod records;
pub mod reference;

pub use context::Context;
pub use keys::{HarvestKey, LotKey, PriorityScopeKey, ShortDemandKey, StagingKey, TransferSkipKey};
pub use pass::Pass;
pub use records::{
    CalculatedTransferRecord, DemandLine, HarvestAllocationRecord, HarvestLedgerSnapshotRecord,
    HarvestUnallocatedRecord, InventoryAllocationRecord, InventoryLot, PlannedTransfer,
    ShortDemandRecord, StopSellRecord,
};
pub use reference::{
    canonical_facility, default_grams_per_unit, rewind_ship_day, CalendarDay, Crop, Customer,
    Facility, FacilityId, FacilityLine, HarvestForecastEntry, Product, ProductId,
    ProductionPriority, RouteConstraint, RouteId, CropId, CustomerId, ROLLOVER_CUSTOMER_ID,
};
