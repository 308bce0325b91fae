//! Per-(date, crop, region) plant-site availability ledger (spec §3, §4.4).
//! The harvest ledger is the single shared mutable resource the driver owns
//! and lends to each component in turn for the duration of a pass.

use allocation_domain::{canonical_facility, Context, HarvestKey};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestLedgerEntry {
    pub starting_plant_sites: f64,
    pub allocated_plant_sites: f64,
    pub sealed: bool,
}

impl HarvestLedgerEntry {
    pub fn available(&self) -> f64 {
        (self.starting_plant_sites - self.allocated_plant_sites).max(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarvestLedger {
    entries: HashMap<HarvestKey, HarvestLedgerEntry>,
}

impl HarvestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds starting plant sites for every `(date, crop, region)` key
    /// implied by the harvest forecast for `date`. Keys not referenced are
    /// created implicitly on first lookup.
    pub fn seed_from_forecast(ctx: &Context, date: chrono::NaiveDate) -> Self {
        let mut ledger = Self::new();
        for entry in ctx.harvest_forecast() {
            if entry.date != date {
                continue;
            }
            let region = canonical_facility(entry.facility_id);
            let key = HarvestKey::new(entry.date, entry.crop_id, region);
            let ledger_entry = ledger.entries.entry(key).or_default();
            ledger_entry.starting_plant_sites += entry.expected_plant_sites;
        }
        ledger
    }

    /// Keys are created implicitly on first reference with zero starting
    /// plant sites, matching the "missing-yield" boundary behavior.
    pub fn entry(&mut self, key: HarvestKey) -> &mut HarvestLedgerEntry {
        self.entries.entry(key).or_default()
    }

    /// Seeds starting plant sites for every `(date, crop, region)` key
    /// implied by the harvest forecast for `date`, without disturbing keys
    /// already present. Unlike `seed_from_forecast`, this mutates an
    /// existing ledger in place so a driver holding one `HarvestLedger` for
    /// the whole date horizon can seed each day's keys exactly once as it
    /// arrives at that day, while still letting the prior-day allocator and
    /// transfer planner `ensure_seeded` keys for days the forward pass has
    /// not reached yet.
    pub fn seed_day(&mut self, ctx: &Context, date: chrono::NaiveDate) {
        for entry in ctx.harvest_forecast() {
            if entry.date != date {
                continue;
            }
            let region = canonical_facility(entry.facility_id);
            let key = HarvestKey::new(entry.date, entry.crop_id, region);
            if self.entries.contains_key(&key) {
                continue;
            }
            let total: f64 = ctx
                .harvest_forecast_for(key.date, key.crop_id, key.region)
                .iter()
                .map(|e| e.expected_plant_sites)
                .sum();
            self.entries.entry(key).or_default().starting_plant_sites = total;
        }
    }

    /// Seeds starting plant sites for `key` from the harvest forecast if the
    /// key has not been referenced yet. Used by the prior-day allocator,
    /// which looks backward into days the forward pass never visited.
    pub fn ensure_seeded(&mut self, ctx: &Context, key: HarvestKey) {
        if self.entries.contains_key(&key) {
            return;
        }
        let total: f64 = ctx
            .harvest_forecast_for(key.date, key.crop_id, key.region)
            .iter()
            .map(|e| e.expected_plant_sites)
            .sum();
        self.entries.entry(key).or_default().starting_plant_sites = total;
    }

    pub fn get(&self, key: &HarvestKey) -> Option<&HarvestLedgerEntry> {
        self.entries.get(key)
    }

    pub fn available(&self, key: &HarvestKey) -> f64 {
        self.entries.get(key).map(|e| e.available()).unwrap_or(0.0)
    }

    pub fn is_sealed(&self, key: &HarvestKey) -> bool {
        self.entries.get(key).map(|e| e.sealed).unwrap_or(false)
    }

    pub fn seal(&mut self, key: HarvestKey) {
        self.entry(key).sealed = true;
    }

    /// Registers a plant-site allocation against `key`. Caller is
    /// responsible for having checked `available >= plant_sites`; the
    /// ledger enforces the invariant that `allocated <= starting` by
    /// clamping, never exceeding it.
    pub fn allocate(&mut self, key: HarvestKey, plant_sites: f64) {
        let entry = self.entry(key);
        entry.allocated_plant_sites = (entry.allocated_plant_sites + plant_sites).min(entry.starting_plant_sites);
    }

    pub fn keys(&self) -> impl Iterator<Item = &HarvestKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HarvestKey, &HarvestLedgerEntry)> {
        self.entries.iter()
    }
}
