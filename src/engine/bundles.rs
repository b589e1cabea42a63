//! Bundle coordinator: expands a bundle into per-tier reservations and
//! applies them all-or-nothing, together with the bundle's own counter.
//!
//! Reservation is two-phase inside one critical section: member tiers are
//! reserved one by one, and any member failure compensates the ones already
//! applied before the error escapes. Nothing partial is ever visible to
//! another caller because the state lock is held throughout.

use uuid::Uuid;

use crate::engine::store::EngineState;
use crate::engine::{tiers, Engine, EngineError};

/// Reserve `unit_count` bundle units: `member.quantity * unit_count` on
/// every member tier plus the bundle's own capacity counter. On failure the
/// error names the exhausted resource and no counter retains a change.
pub fn reserve_bundle(
    state: &mut EngineState,
    bundle_id: Uuid,
    unit_count: u32,
) -> Result<(), EngineError> {
    let bundle = state.bundle(bundle_id)?;
    let available = bundle.total_quantity.saturating_sub(bundle.sold);
    if unit_count > available {
        return Err(EngineError::InsufficientInventory {
            id: bundle_id,
            requested: unit_count,
            available,
        });
    }

    // Resolve the member list up front; a missing tier is a composition
    // problem, not an inventory one, and must reject before any reservation.
    // The multiply is checked: unit_count comes from the request and the
    // capacity check alone does not bound the per-member product.
    let members = member_quantities(state, bundle_id, unit_count)?;
    for (tier_id, _) in &members {
        if !state.tiers.contains_key(tier_id) {
            return Err(EngineError::InvalidBundleComposition(format!(
                "bundle {bundle_id} references missing tier {tier_id}"
            )));
        }
    }

    let mut applied: Vec<(Uuid, u32)> = Vec::with_capacity(members.len());
    for (tier_id, quantity) in members {
        match tiers::reserve(state, tier_id, quantity) {
            Ok(()) => applied.push((tier_id, quantity)),
            Err(err) => {
                // Compensate every reservation this attempt already made.
                for (applied_tier, applied_quantity) in applied.into_iter().rev() {
                    let _ = tiers::release(state, applied_tier, applied_quantity);
                }
                tracing::debug!(%bundle_id, %tier_id, "bundle reservation rolled back");
                return Err(err);
            }
        }
    }

    let bundle = state
        .bundles
        .get_mut(&bundle_id)
        .ok_or_else(|| EngineError::NotFound(format!("bundle {bundle_id}")))?;
    bundle.sold += unit_count;
    tracing::debug!(%bundle_id, unit_count, sold = bundle.sold, "bundle reserved");
    Ok(())
}

/// Per-member tier quantities for `unit_count` bundle units, rejecting any
/// product that does not fit in a u32.
fn member_quantities(
    state: &EngineState,
    bundle_id: Uuid,
    unit_count: u32,
) -> Result<Vec<(Uuid, u32)>, EngineError> {
    state
        .bundle(bundle_id)?
        .included_tiers
        .iter()
        .map(|m| {
            m.quantity
                .checked_mul(unit_count)
                .map(|quantity| (m.tier_id, quantity))
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "unit count {unit_count} overflows member quantity for bundle {bundle_id}"
                    ))
                })
        })
        .collect()
}

/// Mirror of [`reserve_bundle`]: releases every member tier's share and
/// decrements the bundle counter, all inside the same critical section.
pub fn release_bundle(
    state: &mut EngineState,
    bundle_id: Uuid,
    unit_count: u32,
) -> Result<(), EngineError> {
    let members = member_quantities(state, bundle_id, unit_count)?;
    for (tier_id, quantity) in members {
        tiers::release(state, tier_id, quantity)?;
    }
    let bundle = state
        .bundles
        .get_mut(&bundle_id)
        .ok_or_else(|| EngineError::NotFound(format!("bundle {bundle_id}")))?;
    bundle.sold = bundle.sold.saturating_sub(unit_count);
    tracing::debug!(%bundle_id, unit_count, sold = bundle.sold, "bundle released");
    Ok(())
}

impl Engine {
    pub fn reserve_bundle(&self, bundle_id: Uuid, unit_count: u32) -> Result<(), EngineError> {
        reserve_bundle(&mut self.lock(), bundle_id, unit_count)
    }

    pub fn release_bundle(&self, bundle_id: Uuid, unit_count: u32) -> Result<(), EngineError> {
        release_bundle(&mut self.lock(), bundle_id, unit_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bundle, BundleKind, BundleTier, TicketTier};
    use chrono::Utc;

    fn insert_tier(state: &mut EngineState, event_id: Uuid, capacity: u32) -> Uuid {
        let now = Utc::now();
        let tier = TicketTier {
            id: Uuid::new_v4(),
            event_id,
            name: "tier".into(),
            description: None,
            base_price_cents: 1000,
            quantity: capacity,
            sold: 0,
            pricing_schedule: vec![],
            is_table_package: false,
            table_capacity: None,
            created_at: now,
            updated_at: now,
        };
        let id = tier.id;
        state.tiers.insert(id, tier);
        id
    }

    fn insert_bundle(state: &mut EngineState, members: Vec<(Uuid, Uuid, u32)>, total: u32) -> Uuid {
        let now = Utc::now();
        let bundle = Bundle {
            id: Uuid::new_v4(),
            name: "bundle".into(),
            kind: BundleKind::MultiEvent,
            included_tiers: members
                .into_iter()
                .map(|(tier_id, event_id, quantity)| BundleTier {
                    tier_id,
                    event_id,
                    quantity,
                })
                .collect(),
            total_quantity: total,
            sold: 0,
            price_cents: 5000,
            regular_price_cents: 7000,
            created_at: now,
            updated_at: now,
        };
        let id = bundle.id;
        state.bundles.insert(id, bundle);
        id
    }

    #[test]
    fn reserving_a_unit_reserves_every_member_tier() {
        let mut state = EngineState::new();
        let event_a = Uuid::new_v4();
        let event_b = Uuid::new_v4();
        let tier_a = insert_tier(&mut state, event_a, 10);
        let tier_b = insert_tier(&mut state, event_b, 10);
        let bundle = insert_bundle(&mut state, vec![(tier_a, event_a, 2), (tier_b, event_b, 1)], 5);

        reserve_bundle(&mut state, bundle, 3).unwrap();

        assert_eq!(state.tiers[&tier_a].sold, 6);
        assert_eq!(state.tiers[&tier_b].sold, 3);
        assert_eq!(state.bundles[&bundle].sold, 3);
    }

    #[test]
    fn failure_on_second_member_leaves_first_member_untouched() {
        let mut state = EngineState::new();
        let event_a = Uuid::new_v4();
        let event_b = Uuid::new_v4();
        let tier_a = insert_tier(&mut state, event_a, 10);
        let tier_b = insert_tier(&mut state, event_b, 1);
        let bundle = insert_bundle(&mut state, vec![(tier_a, event_a, 1), (tier_b, event_b, 1)], 5);

        let err = reserve_bundle(&mut state, bundle, 2).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientInventory { id, .. } if id == tier_b
        ));

        assert_eq!(state.tiers[&tier_a].sold, 0);
        assert_eq!(state.tiers[&tier_b].sold, 0);
        assert_eq!(state.bundles[&bundle].sold, 0);
    }

    #[test]
    fn bundle_capacity_is_checked_before_any_member() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let tier = insert_tier(&mut state, event, 100);
        let bundle = insert_bundle(&mut state, vec![(tier, event, 1)], 2);

        let err = reserve_bundle(&mut state, bundle, 3).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientInventory { id, .. } if id == bundle
        ));
        assert_eq!(state.tiers[&tier].sold, 0);
    }

    #[test]
    fn release_mirrors_reservation() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let tier_a = insert_tier(&mut state, event, 10);
        let tier_b = insert_tier(&mut state, event, 10);
        let bundle = insert_bundle(&mut state, vec![(tier_a, event, 2), (tier_b, event, 1)], 5);

        reserve_bundle(&mut state, bundle, 2).unwrap();
        release_bundle(&mut state, bundle, 2).unwrap();

        assert_eq!(state.tiers[&tier_a].sold, 0);
        assert_eq!(state.tiers[&tier_b].sold, 0);
        assert_eq!(state.bundles[&bundle].sold, 0);
    }

    #[test]
    fn oversized_unit_count_is_rejected_without_wrapping() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let tier = insert_tier(&mut state, event, u32::MAX);
        let bundle = insert_bundle(&mut state, vec![(tier, event, 4)], u32::MAX);

        // 4 * 2^30 does not fit in a u32; the product must be rejected, not
        // wrapped to 0 with the bundle counter advancing anyway.
        let err = reserve_bundle(&mut state, bundle, 1 << 30).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(state.tiers[&tier].sold, 0);
        assert_eq!(state.bundles[&bundle].sold, 0);
    }

    #[test]
    fn missing_member_tier_is_a_composition_error() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let tier = insert_tier(&mut state, event, 10);
        let ghost = Uuid::new_v4();
        let bundle = insert_bundle(&mut state, vec![(tier, event, 1), (ghost, event, 1)], 5);

        let err = reserve_bundle(&mut state, bundle, 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBundleComposition(_)));
        assert_eq!(state.tiers[&tier].sold, 0);
    }
}
