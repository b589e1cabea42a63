//! Commission attribution: maps a completed referral sale onto the flat
//! reseller hierarchy and posts one entry per paid level.
//!
//! The hierarchy is walked iteratively through `parent_id` with a visited
//! set; it should be acyclic by construction but a corrupted link must not
//! hang the engine. Attribution is idempotent per order: the posting ledger
//! keyed by order id doubles as the already-ran marker, so crash recovery
//! can simply re-run it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::engine::fees::round_half_up;
use crate::engine::store::EngineState;
use crate::engine::{Engine, EngineError};
use crate::models::{CommissionType, OrderStatus, ResellerStaff};

/// One posted commission entry for one staff level of one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionPosting {
    pub staff_id: Uuid,
    pub hierarchy_level: u32,
    pub amount_cents: i64,
    pub posted_at: DateTime<Utc>,
}

fn commission_amount(staff: &ResellerStaff, subtotal_cents: i64, ticket_quantity: u32) -> i64 {
    match staff.commission_type {
        CommissionType::Percentage => round_half_up(
            Decimal::from(subtotal_cents) * staff.commission_value / Decimal::from(100),
        ),
        CommissionType::Fixed => {
            round_half_up(staff.commission_value * Decimal::from(ticket_quantity))
        }
    }
}

/// Attribute commission for a completed order. No-op (returning the
/// existing postings) when attribution already ran; silently posts nothing
/// when the order has no referral code or the code matches no active staff
/// record — the sale stands either way.
pub fn attribute(
    state: &mut EngineState,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<CommissionPosting>, EngineError> {
    if let Some(existing) = state.commission_postings.get(&order_id) {
        return Ok(existing.clone());
    }

    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
    if order.status != OrderStatus::Completed {
        return Err(EngineError::InvalidState(format!(
            "commission attribution requires a completed order, order {order_id} is {:?}",
            order.status
        )));
    }

    let event_id = order.event_id;
    let subtotal_cents = order.subtotal_cents;
    let ticket_quantity = order.ticket_quantity;
    let referral_code = order.referral_code.clone();

    let mut postings = Vec::new();

    let seller_id = referral_code
        .and_then(|code| state.referral_codes.get(&(event_id, code)).copied())
        .filter(|id| state.staff.get(id).is_some_and(|s| s.active));

    if let Some(seller_id) = seller_id {
        let mut visited: HashSet<Uuid> = HashSet::new();
        visited.insert(seller_id);

        // Direct seller: commission plus the ticket count.
        let seller = state
            .staff
            .get_mut(&seller_id)
            .ok_or_else(|| EngineError::NotFound(format!("staff {seller_id}")))?;
        let amount = commission_amount(seller, subtotal_cents, ticket_quantity);
        seller.commission_earned_cents += amount;
        seller.tickets_sold += ticket_quantity;
        seller.updated_at = now;
        postings.push(CommissionPosting {
            staff_id: seller_id,
            hierarchy_level: seller.hierarchy_level,
            amount_cents: amount,
            posted_at: now,
        });
        let mut parent_id = seller.parent_id;

        // Ancestors: each level's override comes from its own configured
        // commission value, never derived from the child's.
        while let Some(ancestor_id) = parent_id {
            if !visited.insert(ancestor_id) {
                tracing::warn!(%ancestor_id, %order_id, "cycle in staff hierarchy, stopping walk");
                break;
            }
            let Some(ancestor) = state.staff.get_mut(&ancestor_id) else {
                break;
            };
            if !ancestor.can_assign_sub_sellers {
                break;
            }
            if ancestor.active {
                let amount = commission_amount(ancestor, subtotal_cents, ticket_quantity);
                ancestor.commission_earned_cents += amount;
                ancestor.updated_at = now;
                postings.push(CommissionPosting {
                    staff_id: ancestor_id,
                    hierarchy_level: ancestor.hierarchy_level,
                    amount_cents: amount,
                    posted_at: now,
                });
            }
            parent_id = ancestor.parent_id;
        }

        tracing::info!(%order_id, levels = postings.len(), "commission attributed");
    } else if order_has_code(state, order_id) {
        tracing::debug!(%order_id, "referral code unmatched or inactive, no commission");
    }

    // Record even an empty run so re-attribution stays a no-op.
    state.commission_postings.insert(order_id, postings.clone());
    Ok(postings)
}

fn order_has_code(state: &EngineState, order_id: Uuid) -> bool {
    state
        .orders
        .get(&order_id)
        .is_some_and(|o| o.referral_code.is_some())
}

impl Engine {
    /// Re-runnable attribution entry point for crash recovery: idempotent
    /// per order id.
    pub fn attribute_commission(
        &self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CommissionPosting>, EngineError> {
        attribute(&mut self.lock(), order_id, now)
    }

    pub fn commission_postings(&self, order_id: Uuid) -> Vec<CommissionPosting> {
        self.lock()
            .commission_postings
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, PaymentModel, StaffRole};

    fn insert_staff(
        state: &mut EngineState,
        event_id: Uuid,
        parent_id: Option<Uuid>,
        level: u32,
        commission_type: CommissionType,
        value: &str,
        code: &str,
        can_assign: bool,
    ) -> Uuid {
        let now = Utc::now();
        let staff = ResellerStaff {
            id: Uuid::new_v4(),
            event_id,
            name: format!("staff-{code}"),
            role: StaffRole::TeamMember,
            parent_id,
            hierarchy_level: level,
            allocated_tickets: 100,
            tickets_sold: 0,
            commission_type,
            commission_value: value.parse().unwrap(),
            commission_earned_cents: 0,
            referral_code: code.to_string(),
            can_assign_sub_sellers: can_assign,
            max_sub_sellers: 10,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let id = staff.id;
        state.referral_codes.insert((event_id, code.to_string()), id);
        state.staff.insert(id, staff);
        id
    }

    fn insert_completed_order(
        state: &mut EngineState,
        event_id: Uuid,
        subtotal_cents: i64,
        ticket_quantity: u32,
        referral_code: Option<&str>,
    ) -> Uuid {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            event_id,
            lines: vec![],
            payment_model: PaymentModel::Card,
            subtotal_cents,
            platform_fee_cents: 0,
            processing_fee_cents: 0,
            total_cents: subtotal_cents,
            status: OrderStatus::Completed,
            referral_code: referral_code.map(str::to_string),
            deferred_activation: false,
            credits_debited: 0,
            ticket_quantity,
            external_payment_ref: None,
            expires_at: now,
            created_at: now,
            updated_at: now,
        };
        let id = order.id;
        state.orders.insert(id, order);
        id
    }

    #[test]
    fn percentage_commission_posts_to_seller_and_counts_tickets() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let seller = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Percentage,
            "8",
            "ALICE8",
            false,
        );
        let order = insert_completed_order(&mut state, event, 10_050, 3, Some("ALICE8"));

        let postings = attribute(&mut state, order, Utc::now()).unwrap();
        assert_eq!(postings.len(), 1);
        // round(10050 * 8%) = 804
        assert_eq!(postings[0].amount_cents, 804);

        let seller = &state.staff[&seller];
        assert_eq!(seller.commission_earned_cents, 804);
        assert_eq!(seller.tickets_sold, 3);
    }

    #[test]
    fn fixed_commission_pays_per_ticket() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let seller = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Fixed,
            "150",
            "BOB",
            false,
        );
        let order = insert_completed_order(&mut state, event, 9_000, 4, Some("BOB"));

        attribute(&mut state, order, Utc::now()).unwrap();
        assert_eq!(state.staff[&seller].commission_earned_cents, 600);
    }

    #[test]
    fn ancestors_receive_their_own_configured_override() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        // Child 8%, parent 12%: both independently configured values.
        let parent = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Percentage,
            "12",
            "PARENT",
            true,
        );
        let child = insert_staff(
            &mut state,
            event,
            Some(parent),
            2,
            CommissionType::Percentage,
            "8",
            "CHILD",
            false,
        );
        let order = insert_completed_order(&mut state, event, 10_000, 2, Some("CHILD"));

        let postings = attribute(&mut state, order, Utc::now()).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(state.staff[&child].commission_earned_cents, 800);
        assert_eq!(state.staff[&parent].commission_earned_cents, 1200);
        // Only the direct seller's ticket counter moves.
        assert_eq!(state.staff[&child].tickets_sold, 2);
        assert_eq!(state.staff[&parent].tickets_sold, 0);
    }

    #[test]
    fn walk_stops_at_an_ancestor_that_cannot_assign_sub_sellers() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let grandparent = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Percentage,
            "20",
            "GP",
            true,
        );
        let parent = insert_staff(
            &mut state,
            event,
            Some(grandparent),
            2,
            CommissionType::Percentage,
            "12",
            "P",
            false,
        );
        let child = insert_staff(
            &mut state,
            event,
            Some(parent),
            3,
            CommissionType::Percentage,
            "8",
            "C",
            false,
        );
        let order = insert_completed_order(&mut state, event, 10_000, 1, Some("C"));

        attribute(&mut state, order, Utc::now()).unwrap();
        assert_eq!(state.staff[&child].commission_earned_cents, 800);
        // Parent cannot assign sub-sellers, so the walk ends before paying
        // anyone above the child.
        assert_eq!(state.staff[&parent].commission_earned_cents, 0);
        assert_eq!(state.staff[&grandparent].commission_earned_cents, 0);
    }

    #[test]
    fn attribution_is_idempotent_per_order() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let seller = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Percentage,
            "10",
            "X",
            false,
        );
        let order = insert_completed_order(&mut state, event, 5_000, 2, Some("X"));

        let first = attribute(&mut state, order, Utc::now()).unwrap();
        let second = attribute(&mut state, order, Utc::now()).unwrap();
        assert_eq!(first, second);
        assert_eq!(state.staff[&seller].commission_earned_cents, 500);
        assert_eq!(state.staff[&seller].tickets_sold, 2);
    }

    #[test]
    fn unknown_referral_code_posts_nothing_but_marks_the_order() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let order = insert_completed_order(&mut state, event, 5_000, 2, Some("NOBODY"));

        let postings = attribute(&mut state, order, Utc::now()).unwrap();
        assert!(postings.is_empty());
        assert!(state.commission_postings.contains_key(&order));
    }

    #[test]
    fn hierarchy_cycle_does_not_hang_the_walk() {
        let mut state = EngineState::new();
        let event = Uuid::new_v4();
        let a = insert_staff(
            &mut state,
            event,
            None,
            1,
            CommissionType::Percentage,
            "5",
            "A",
            true,
        );
        let b = insert_staff(
            &mut state,
            event,
            Some(a),
            2,
            CommissionType::Percentage,
            "5",
            "B",
            true,
        );
        // Corrupt the hierarchy: a's parent is b.
        state.staff.get_mut(&a).unwrap().parent_id = Some(b);

        let order = insert_completed_order(&mut state, event, 1_000, 1, Some("B"));
        let postings = attribute(&mut state, order, Utc::now()).unwrap();
        // B (direct) and A (ancestor) post once each; the loop stops when it
        // sees B again.
        assert_eq!(postings.len(), 2);
    }
}
