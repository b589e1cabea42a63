//! Tier registry: active-price resolution against the time-windowed pricing
//! schedule, and the oversell-safe reserve/release pair every purchase path
//! funnels through.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::store::EngineState;
use crate::engine::{Engine, EngineError};
use crate::models::TicketTier;

/// The resolved price plus the next schedule boundary, for urgency display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub current_price_cents: i64,
    pub next_price_cents: Option<i64>,
    pub next_change_at: Option<DateTime<Utc>>,
}

/// Resolve the active price at `at`.
///
/// Windows are half-open `[from, until)` and the schedule is kept sorted by
/// `available_from`, so on boundary overlap the earliest-starting window
/// wins. A time before every window quotes the earliest window's price; a
/// time after every window, or an empty schedule, falls back to the base
/// price.
pub fn resolve_price(tier: &TicketTier, at: DateTime<Utc>) -> PriceQuote {
    let schedule = &tier.pricing_schedule;

    let current_price_cents = schedule
        .iter()
        .find(|w| w.available_from <= at && at < w.available_until)
        .map(|w| w.price_cents)
        .or_else(|| {
            schedule
                .first()
                .filter(|w| at < w.available_from)
                .map(|w| w.price_cents)
        })
        .unwrap_or(tier.base_price_cents);

    let next = schedule.iter().find(|w| w.available_from > at);

    PriceQuote {
        current_price_cents,
        next_price_cents: next.map(|w| w.price_cents),
        next_change_at: next.map(|w| w.available_from),
    }
}

/// Reserve `quantity` units, failing without side effects when the tier
/// cannot cover the request. Callers already hold the state lock, so the
/// check and the increment are one atomic step.
pub fn reserve(state: &mut EngineState, tier_id: Uuid, quantity: u32) -> Result<(), EngineError> {
    let tier = state.tier_mut(tier_id)?;
    let available = tier.available();
    if quantity > available {
        return Err(EngineError::InsufficientInventory {
            id: tier_id,
            requested: quantity,
            available,
        });
    }
    tier.sold += quantity;
    tracing::debug!(%tier_id, quantity, sold = tier.sold, "tier reserved");
    Ok(())
}

/// Release previously reserved units (order cancelled before completion).
/// Never drives `sold` below zero.
pub fn release(state: &mut EngineState, tier_id: Uuid, quantity: u32) -> Result<(), EngineError> {
    let tier = state.tier_mut(tier_id)?;
    tier.sold = tier.sold.saturating_sub(quantity);
    tracing::debug!(%tier_id, quantity, sold = tier.sold, "tier released");
    Ok(())
}

impl Engine {
    pub fn quote_price(&self, tier_id: Uuid, at: DateTime<Utc>) -> Result<PriceQuote, EngineError> {
        let state = self.lock();
        Ok(resolve_price(state.tier(tier_id)?, at))
    }

    pub fn reserve_tier(&self, tier_id: Uuid, quantity: u32) -> Result<(), EngineError> {
        reserve(&mut self.lock(), tier_id, quantity)
    }

    pub fn release_tier(&self, tier_id: Uuid, quantity: u32) -> Result<(), EngineError> {
        release(&mut self.lock(), tier_id, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingWindow;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, h, 0, 0).unwrap()
    }

    fn tier_with_schedule(windows: Vec<PricingWindow>) -> TicketTier {
        TicketTier {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "GA".into(),
            description: None,
            base_price_cents: 5000,
            quantity: 100,
            sold: 0,
            pricing_schedule: windows,
            is_table_package: false,
            table_capacity: None,
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn window(price: i64, from: u32, until: u32) -> PricingWindow {
        PricingWindow {
            price_cents: price,
            available_from: ts(from),
            available_until: ts(until),
        }
    }

    #[test]
    fn no_schedule_quotes_base_price() {
        let tier = tier_with_schedule(vec![]);
        let quote = resolve_price(&tier, ts(12));
        assert_eq!(quote.current_price_cents, 5000);
        assert_eq!(quote.next_price_cents, None);
        assert_eq!(quote.next_change_at, None);
    }

    #[test]
    fn active_window_wins_and_reports_next_boundary() {
        let tier = tier_with_schedule(vec![window(3000, 6, 12), window(4000, 12, 18)]);
        let quote = resolve_price(&tier, ts(8));
        assert_eq!(quote.current_price_cents, 3000);
        assert_eq!(quote.next_price_cents, Some(4000));
        assert_eq!(quote.next_change_at, Some(ts(12)));
    }

    #[test]
    fn windows_are_half_open_at_the_boundary() {
        let tier = tier_with_schedule(vec![window(3000, 6, 12), window(4000, 12, 18)]);
        // Exactly at the boundary the second window owns the instant.
        assert_eq!(resolve_price(&tier, ts(12)).current_price_cents, 4000);
    }

    #[test]
    fn overlapping_windows_resolve_to_earliest_start() {
        let tier = tier_with_schedule(vec![window(3000, 6, 14), window(4000, 12, 18)]);
        assert_eq!(resolve_price(&tier, ts(13)).current_price_cents, 3000);
    }

    #[test]
    fn before_all_windows_quotes_earliest_entry() {
        let tier = tier_with_schedule(vec![window(3000, 6, 12)]);
        let quote = resolve_price(&tier, ts(2));
        assert_eq!(quote.current_price_cents, 3000);
        assert_eq!(quote.next_change_at, Some(ts(6)));
    }

    #[test]
    fn after_all_windows_falls_back_to_base_price() {
        let tier = tier_with_schedule(vec![window(3000, 6, 12)]);
        let quote = resolve_price(&tier, ts(20));
        assert_eq!(quote.current_price_cents, 5000);
        assert_eq!(quote.next_price_cents, None);
    }

    #[test]
    fn reserve_rejects_past_capacity_without_side_effects() {
        let mut state = EngineState::new();
        let mut tier = tier_with_schedule(vec![]);
        tier.quantity = 3;
        let id = tier.id;
        state.tiers.insert(id, tier);

        assert!(reserve(&mut state, id, 2).is_ok());
        let err = reserve(&mut state, id, 2).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientInventory {
                id,
                requested: 2,
                available: 1
            }
        );
        assert_eq!(state.tiers[&id].sold, 2);

        assert!(reserve(&mut state, id, 1).is_ok());
        assert_eq!(state.tiers[&id].sold, 3);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut state = EngineState::new();
        let tier = tier_with_schedule(vec![]);
        let id = tier.id;
        state.tiers.insert(id, tier);

        reserve(&mut state, id, 2).unwrap();
        release(&mut state, id, 5).unwrap();
        assert_eq!(state.tiers[&id].sold, 0);
    }
}
