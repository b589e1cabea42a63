//! The ticket inventory, pricing and settlement engine.
//!
//! Six components behind one entry point: tier pricing and reservation
//! ([`tiers`]), pure fee math ([`fees`]), prepaid credit accounts
//! ([`credits`]), atomic multi-tier bundles ([`bundles`]), reseller
//! commission attribution ([`commission`]) and the order state machine
//! ([`settlement`]). HTTP handlers stay thin and call into [`Engine`].

pub mod bundles;
pub mod commission;
pub mod credits;
pub mod fees;
pub mod settlement;
pub mod store;
pub mod tiers;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Bundle, BundleKind, BundleTier, CommissionType, CreditAccount, Order, PaymentConfig,
    PaymentModel, PricingWindow, ResellerStaff, StaffRole, Ticket, TicketTier,
};
use store::EngineState;

/// Failure kinds surfaced by engine operations. Monetary arithmetic never
/// fails recoverably; anything in that family is a bug, not an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("insufficient inventory on {id}: requested {requested}, {available} available")]
    InsufficientInventory {
        id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("insufficient credits: {needed} needed, {remaining} remaining")]
    InsufficientCredits { needed: u32, remaining: u32 },

    #[error("invalid bundle composition: {0}")]
    InvalidBundleComposition(String),

    #[error("no payment config for event {0}")]
    FeeConfigMissing(Uuid),

    #[error("refund blocked: {0}")]
    RefundBlocked(String),

    #[error("order {0} expired before confirmation")]
    StaleOrder(Uuid),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// The engine: all shared state behind a single mutex.
///
/// Every public operation locks once, does all of its reads, checks and
/// writes inside that critical section, and releases before returning. The
/// lock is never held across an await point (nothing in here is async).
pub struct Engine {
    state: Mutex<EngineState>,
    pending_order_ttl: Duration,
}

impl Engine {
    pub fn new(pending_order_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
            pending_order_ttl,
        }
    }

    pub fn pending_order_ttl(&self) -> Duration {
        self.pending_order_ttl
    }

    /// A poisoned mutex means a panic mid-operation; the state is still the
    /// last consistent snapshot because operations validate before mutating,
    /// so recover the guard rather than cascading the panic.
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Organizer setup surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentConfig {
    pub event_id: Uuid,
    pub organizer_id: Uuid,
    pub model: PaymentModel,
    #[serde(default)]
    pub platform_fee_percent: Decimal,
    #[serde(default)]
    pub platform_fee_fixed_cents: i64,
    #[serde(default)]
    pub processing_fee_percent: Decimal,
    #[serde(default)]
    pub processing_fee_fixed_cents: i64,
    #[serde(default)]
    pub charity_discount: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTier {
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price_cents: i64,
    pub quantity: u32,
    #[serde(default)]
    pub pricing_schedule: Vec<PricingWindow>,
    #[serde(default)]
    pub is_table_package: bool,
    pub table_capacity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBundle {
    pub name: String,
    pub kind: BundleKind,
    pub included_tiers: Vec<BundleTier>,
    pub total_quantity: u32,
    pub price_cents: i64,
    pub regular_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub event_id: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub allocated_tickets: u32,
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
    pub referral_code: String,
    #[serde(default)]
    pub can_assign_sub_sellers: bool,
    #[serde(default)]
    pub max_sub_sellers: u32,
}

impl Engine {
    pub fn create_payment_config(
        &self,
        req: NewPaymentConfig,
    ) -> Result<PaymentConfig, EngineError> {
        if req.platform_fee_percent < Decimal::ZERO
            || req.processing_fee_percent < Decimal::ZERO
            || req.platform_fee_fixed_cents < 0
            || req.processing_fee_fixed_cents < 0
        {
            return Err(EngineError::Validation(
                "fee components must be non-negative".into(),
            ));
        }

        let mut state = self.lock();
        if state.payment_configs.contains_key(&req.event_id) {
            return Err(EngineError::InvalidState(format!(
                "event {} already has a payment config",
                req.event_id
            )));
        }

        let config = PaymentConfig {
            event_id: req.event_id,
            organizer_id: req.organizer_id,
            model: req.model,
            platform_fee_percent: req.platform_fee_percent,
            platform_fee_fixed_cents: req.platform_fee_fixed_cents,
            processing_fee_percent: req.processing_fee_percent,
            processing_fee_fixed_cents: req.processing_fee_fixed_cents,
            charity_discount: req.charity_discount,
        };
        state.payment_configs.insert(req.event_id, config.clone());
        tracing::info!(event_id = %req.event_id, model = ?req.model, "payment config created");
        Ok(config)
    }

    pub fn create_tier(&self, req: NewTier, now: DateTime<Utc>) -> Result<TicketTier, EngineError> {
        if req.base_price_cents < 0 {
            return Err(EngineError::Validation("base price must be non-negative".into()));
        }
        if req.quantity == 0 {
            return Err(EngineError::Validation("tier capacity must be positive".into()));
        }
        for window in &req.pricing_schedule {
            if window.available_until <= window.available_from {
                return Err(EngineError::Validation(
                    "pricing window must end after it starts".into(),
                ));
            }
        }

        let mut schedule = req.pricing_schedule;
        schedule.sort_by_key(|w| w.available_from);

        let tier = TicketTier {
            id: Uuid::new_v4(),
            event_id: req.event_id,
            name: req.name,
            description: req.description,
            base_price_cents: req.base_price_cents,
            quantity: req.quantity,
            sold: 0,
            pricing_schedule: schedule,
            is_table_package: req.is_table_package,
            table_capacity: req.table_capacity,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock();
        state.tiers.insert(tier.id, tier.clone());
        tracing::info!(tier_id = %tier.id, event_id = %tier.event_id, quantity = tier.quantity, "tier created");
        Ok(tier)
    }

    pub fn create_bundle(&self, req: NewBundle, now: DateTime<Utc>) -> Result<Bundle, EngineError> {
        if req.included_tiers.is_empty() {
            return Err(EngineError::InvalidBundleComposition(
                "bundle has no member tiers".into(),
            ));
        }
        if req.included_tiers.iter().any(|t| t.quantity == 0) {
            return Err(EngineError::InvalidBundleComposition(
                "member quantity must be positive".into(),
            ));
        }
        if req
            .included_tiers
            .iter()
            .try_fold(0u32, |acc, t| acc.checked_add(t.quantity))
            .is_none()
        {
            return Err(EngineError::InvalidBundleComposition(
                "member quantities exceed the representable ticket yield".into(),
            ));
        }

        let mut state = self.lock();
        for member in &req.included_tiers {
            let tier = state.tiers.get(&member.tier_id).ok_or_else(|| {
                EngineError::InvalidBundleComposition(format!(
                    "member tier {} does not exist",
                    member.tier_id
                ))
            })?;
            if tier.event_id != member.event_id {
                return Err(EngineError::InvalidBundleComposition(format!(
                    "member tier {} does not belong to event {}",
                    member.tier_id, member.event_id
                )));
            }
        }
        if req.kind == BundleKind::SingleEvent {
            let first = req.included_tiers[0].event_id;
            if req.included_tiers.iter().any(|t| t.event_id != first) {
                return Err(EngineError::InvalidBundleComposition(
                    "single-event bundle spans multiple events".into(),
                ));
            }
        }

        let bundle = Bundle {
            id: Uuid::new_v4(),
            name: req.name,
            kind: req.kind,
            included_tiers: req.included_tiers,
            total_quantity: req.total_quantity,
            sold: 0,
            price_cents: req.price_cents,
            regular_price_cents: req.regular_price_cents,
            created_at: now,
            updated_at: now,
        };
        state.bundles.insert(bundle.id, bundle.clone());
        tracing::info!(bundle_id = %bundle.id, kind = ?bundle.kind, "bundle created");
        Ok(bundle)
    }

    pub fn create_staff(
        &self,
        req: NewStaff,
        now: DateTime<Utc>,
    ) -> Result<ResellerStaff, EngineError> {
        let mut state = self.lock();

        let code_key = (req.event_id, req.referral_code.clone());
        if state.referral_codes.contains_key(&code_key) {
            return Err(EngineError::Validation(format!(
                "referral code '{}' already in use for this event",
                req.referral_code
            )));
        }

        let hierarchy_level = match req.parent_id {
            None => 1,
            Some(parent_id) => {
                let parent = state
                    .staff
                    .get(&parent_id)
                    .ok_or_else(|| EngineError::NotFound(format!("staff {parent_id}")))?;
                if parent.event_id != req.event_id {
                    return Err(EngineError::Validation(
                        "parent staff belongs to a different event".into(),
                    ));
                }
                if !parent.can_assign_sub_sellers {
                    return Err(EngineError::Validation(
                        "parent staff may not assign sub-sellers".into(),
                    ));
                }
                let children = state
                    .staff
                    .values()
                    .filter(|s| s.parent_id == Some(parent_id))
                    .count() as u32;
                if children >= parent.max_sub_sellers {
                    return Err(EngineError::Validation(format!(
                        "parent staff already has {} sub-sellers (max {})",
                        children, parent.max_sub_sellers
                    )));
                }
                parent.hierarchy_level + 1
            }
        };

        let staff = ResellerStaff {
            id: Uuid::new_v4(),
            event_id: req.event_id,
            name: req.name,
            role: req.role,
            parent_id: req.parent_id,
            hierarchy_level,
            allocated_tickets: req.allocated_tickets,
            tickets_sold: 0,
            commission_type: req.commission_type,
            commission_value: req.commission_value,
            commission_earned_cents: 0,
            referral_code: req.referral_code,
            can_assign_sub_sellers: req.can_assign_sub_sellers,
            max_sub_sellers: req.max_sub_sellers,
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.referral_codes.insert(code_key, staff.id);
        state.staff.insert(staff.id, staff.clone());
        tracing::info!(staff_id = %staff.id, level = staff.hierarchy_level, "reseller staff created");
        Ok(staff)
    }
}

// ---------------------------------------------------------------------------
// Read surface (used by handlers and tests)
// ---------------------------------------------------------------------------

impl Engine {
    pub fn tier(&self, id: Uuid) -> Option<TicketTier> {
        self.lock().tiers.get(&id).cloned()
    }

    pub fn bundle(&self, id: Uuid) -> Option<Bundle> {
        self.lock().bundles.get(&id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<Order> {
        self.lock().orders.get(&id).cloned()
    }

    pub fn staff(&self, id: Uuid) -> Option<ResellerStaff> {
        self.lock().staff.get(&id).cloned()
    }

    pub fn credit_account(&self, organizer_id: Uuid) -> Option<CreditAccount> {
        self.lock().credit_accounts.get(&organizer_id).cloned()
    }

    pub fn tickets_for_order(&self, order_id: Uuid) -> Vec<Ticket> {
        let state = self.lock();
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| t.order_id == order_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        tickets
    }
}
