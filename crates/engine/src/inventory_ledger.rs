//! Per-lot inventory ledger: FEFO draw, day-to-day rollover, smoothing of
//! newly harvested production into tomorrow's lots (spec §4.2).

use allocation_domain::{canonical_facility, FacilityId, InventoryLot, LotKey, ProductId};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    lots: HashMap<LotKey, InventoryLot>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lots(lots: Vec<InventoryLot>) -> Self {
        let mut ledger = Self::new();
        for lot in lots {
            ledger.merge_inbound(lot.facility_id, lot.product_id, lot.enjoy_by_date, lot.qty);
        }
        ledger
    }

    /// Merges an inbound quantity into the matching lot, creating one if
    /// none exists. Two inbound entries for the same key are additive.
    pub fn merge_inbound(&mut self, facility_id: FacilityId, product_id: ProductId, enjoy_by_date: NaiveDate, qty: i64) {
        let key = LotKey::new(facility_id, product_id, enjoy_by_date);
        self.lots
            .entry(key)
            .and_modify(|lot| lot.merge(qty))
            .or_insert(InventoryLot {
                facility_id,
                product_id,
                enjoy_by_date,
                qty,
            });
    }

    pub fn get(&self, key: &LotKey) -> Option<&InventoryLot> {
        self.lots.get(key).filter(|lot| lot.is_present())
    }

    pub fn get_mut(&mut self, key: &LotKey) -> Option<&mut InventoryLot> {
        self.lots.get_mut(key)
    }

    pub fn remove(&mut self, key: &LotKey) {
        self.lots.remove(key);
    }

    pub fn all(&self) -> impl Iterator<Item = &InventoryLot> {
        self.lots.values().filter(|lot| lot.is_present())
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut InventoryLot> {
        self.lots.values_mut()
    }

    /// FEFO-ordered candidate lots for a product at a region: same product,
    /// same canonicalized facility region, sorted by ascending enjoy-by-date.
    pub fn fefo_candidates(&self, product_id: ProductId, region: FacilityId) -> Vec<LotKey> {
        let mut candidates: Vec<LotKey> = self
            .lots
            .iter()
            .filter(|(key, lot)| {
                lot.is_present()
                    && key.product_id == product_id
                    && canonical_facility(key.facility_id) == region
            })
            .map(|(key, _)| *key)
            .collect();
        candidates.sort_by_key(|key| key.enjoy_by_date);
        candidates
    }

    /// Draws up to `qty` from the given lot, returning the amount actually
    /// drawn. Drains the lot fully if it does not cover the full draw.
    pub fn draw(&mut self, key: &LotKey, qty: i64) -> i64 {
        let Some(lot) = self.lots.get_mut(key) else {
            return 0;
        };
        let drawn = qty.min(lot.qty);
        lot.qty -= drawn;
        drawn
    }

    /// Drops any lot whose pack date (`enjoy_by_date - total_shelf_life_days`)
    /// has not yet passed `morning_date`, unless its product is food
    /// service, which carries indefinitely within shelf life.
    pub fn retain_for_rollover(
        &mut self,
        morning_date: NaiveDate,
        total_shelf_life_days: impl Fn(ProductId) -> Option<i64>,
        is_food_service: impl Fn(ProductId) -> bool,
    ) {
        self.lots.retain(|key, lot| {
            if lot.qty <= 0 {
                return false;
            }
            match total_shelf_life_days(key.product_id) {
                Some(total) => {
                    let pack_date = key.enjoy_by_date - chrono::Duration::days(total);
                    pack_date < morning_date || is_food_service(key.product_id)
                }
                None => is_food_service(key.product_id),
            }
        });
    }

    /// Adds manufactured harvest-to-inventory quantities from the previous
    /// day's rollover pass as new lots with `enjoy_by_date = prev_day +
    /// total_shelf_life`, then leaves the ledger re-compacted (merging is
    /// inherent to `merge_inbound`).
    pub fn smooth_rollover(
        &mut self,
        prev_day: NaiveDate,
        rollover_harvest_qty: &[(FacilityId, ProductId, i64)],
        total_shelf_life_days: impl Fn(ProductId) -> Option<i64>,
    ) {
        for &(facility_id, product_id, qty) in rollover_harvest_qty {
            if qty <= 0 {
                continue;
            }
            let Some(total) = total_shelf_life_days(product_id) else {
                continue;
            };
            let enjoy_by_date = prev_day + chrono::Duration::days(total);
            self.merge_inbound(facility_id, product_id, enjoy_by_date, qty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_inbound_is_additive() {
        let mut ledger = InventoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, date, 50);
        ledger.merge_inbound(3, 1, date, 25);
        let key = LotKey::new(3, 1, date);
        assert_eq!(ledger.get(&key).unwrap().qty, 75);
    }

    #[test]
    fn fefo_candidates_sorted_ascending() {
        let mut ledger = InventoryLedger::new();
        let d1 = NaiveDate::from_ymd_opt(2022, 5, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, d1, 10);
        ledger.merge_inbound(3, 1, d2, 10);
        let candidates = ledger.fefo_candidates(1, 3);
        assert_eq!(candidates[0].enjoy_by_date, d2);
        assert_eq!(candidates[1].enjoy_by_date, d1);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn draw_sequence_conserves_quantity(
            merges in prop::collection::vec(1i64..500, 1..8),
            draws in prop::collection::vec(0i64..200, 1..8),
        ) {
            let mut ledger = InventoryLedger::new();
            let date = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
            let key = LotKey::new(3, 1, date);
            let total: i64 = merges.iter().sum();
            for qty in &merges {
                ledger.merge_inbound(3, 1, date, *qty);
            }

            let mut drawn_total = 0i64;
            for qty in &draws {
                drawn_total += ledger.draw(&key, *qty);
            }

            let remaining = ledger.get(&key).map(|lot| lot.qty).unwrap_or(0);
            prop_assert_eq!(drawn_total + remaining, total);
            prop_assert!(remaining >= 0);
        }
    }

    #[test]
    fn fefo_candidates_match_across_canonicalized_region() {
        let mut ledger = InventoryLedger::new();
        let d1 = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(1, 1, d1, 10); // facility 1 canonicalizes to 3
        let candidates = ledger.fefo_candidates(1, 3);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn draw_drains_lot_when_demand_exceeds_quantity() {
        let mut ledger = InventoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, date, 40);
        let key = LotKey::new(3, 1, date);
        let drawn = ledger.draw(&key, 100);
        assert_eq!(drawn, 40);
        assert!(ledger.get(&key).is_none());
    }

    #[test]
    fn zero_quantity_lot_is_absent() {
        let mut ledger = InventoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, date, 10);
        let key = LotKey::new(3, 1, date);
        ledger.draw(&key, 10);
        assert!(ledger.get(&key).is_none());
    }
}
