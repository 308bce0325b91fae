//! Stop-sell and forecast projection (spec §4.6): ages lots out of the
//! active set once their shelf-life guarantee window has closed, and merges
//! tier-1 inbound planned transfers into the active lot set.

use allocation_domain::{Context, PlannedTransfer, StopSellRecord};
use chrono::NaiveDate;

use crate::driver::DemandShare;
use crate::inventory_ledger::InventoryLedger;

/// Removes lots whose `enjoy_by_date - shelf_life_guarantee < forecast_date`
/// from the active ledger, emitting a stop-sell record for each. On the
/// scaled sub-pass of tier 1 — the single point in the day this should run —
/// merges inbound planned transfers arriving on `forecast_date` into the
/// active set first.
pub fn project(
    ctx: &Context,
    ledger: &mut InventoryLedger,
    forecast_date: NaiveDate,
    tier: u32,
    share: DemandShare,
    inbound_transfers: &[PlannedTransfer],
) -> Vec<StopSellRecord> {
    if tier == 1 && share == DemandShare::Scaled {
        for transfer in inbound_transfers {
            if transfer.arrival_date == forecast_date {
                ledger.merge_inbound(
                    transfer.arrival_facility_id,
                    transfer.product_id,
                    transfer.enjoy_by_date,
                    transfer.qty,
                );
            }
        }
    }

    let expired_keys: Vec<_> = ledger
        .all()
        .filter_map(|lot| {
            let product = ctx.product(lot.product_id)?;
            let guarantee_date = product.shelf_life_guarantee_date(lot.enjoy_by_date);
            if guarantee_date < forecast_date && lot.qty > 0 {
                Some((
                    allocation_domain::LotKey::new(lot.facility_id, lot.product_id, lot.enjoy_by_date),
                    lot.qty,
                ))
            } else {
                None
            }
        })
        .collect();

    let mut records = Vec::with_capacity(expired_keys.len());
    for (key, qty) in expired_keys {
        records.push(StopSellRecord {
            forecast_date,
            facility_id: key.facility_id,
            product_id: key.product_id,
            enjoy_by_date: key.enjoy_by_date,
            qty,
        });
        ledger.remove(&key);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_domain::{Product, ROLLOVER_CUSTOMER_ID};

    fn ctx_with_product(shelf_life_guarantee_days: i64) -> Context {
        let product = Product {
            id: 1,
            crop_id: 1,
            net_weight_g: 128.0,
            whole: false,
            shelf_life_guarantee_days,
            total_shelf_life_days: 25,
            production_priority: 2,
            lead_time_days: 0,
            case_equivalent_multiplier: 1.0,
            cases_per_pallet: 1.0,
        };
        let _ = ROLLOVER_CUSTOMER_ID;
        Context::new(
            NaiveDate::from_ymd_opt(2022, 4, 16).unwrap(),
            "test-run".to_string(),
            vec![],
            vec![],
            vec![],
            vec![product],
            vec![],
            vec![],
            vec![],
            vec![],
        )
    }

    #[test]
    fn lot_that_expired_is_moved_to_stop_sell() {
        let ctx = ctx_with_product(10);
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 4, 25).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 20);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 16).unwrap();
        let records = project(&ctx, &mut ledger, forecast_date, 1, DemandShare::Scaled, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].qty, 20);
        assert!(ledger.get(&allocation_domain::LotKey::new(3, 1, enjoy_by)).is_none());
    }

    #[test]
    fn lot_still_within_guarantee_window_is_kept() {
        let ctx = ctx_with_product(10);
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        ledger.merge_inbound(3, 1, enjoy_by, 20);
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 16).unwrap();
        let records = project(&ctx, &mut ledger, forecast_date, 1, DemandShare::Scaled, &[]);
        assert!(records.is_empty());
        assert!(ledger.get(&allocation_domain::LotKey::new(3, 1, enjoy_by)).is_some());
    }

    #[test]
    fn tier_one_merges_inbound_transfer_arriving_today() {
        let ctx = ctx_with_product(10);
        let mut ledger = InventoryLedger::new();
        let enjoy_by = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        let forecast_date = NaiveDate::from_ymd_opt(2022, 4, 22).unwrap();
        let transfer = PlannedTransfer {
            ship_date: forecast_date - chrono::Duration::days(2),
            arrival_date: forecast_date,
            ship_facility_id: 7,
            arrival_facility_id: 3,
            product_id: 1,
            enjoy_by_date: enjoy_by,
            qty: 15,
        };
        project(&ctx, &mut ledger, forecast_date, 1, DemandShare::Scaled, &[transfer]);
        assert_eq!(ledger.get(&allocation_domain::LotKey::new(3, 1, enjoy_by)).unwrap().qty, 15);
    }
}
