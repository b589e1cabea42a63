use std::collections::HashMap;

use uuid::Uuid;

use crate::engine::commission::CommissionPosting;
use crate::engine::EngineError;
use crate::models::{
    Bundle, CreditAccount, CreditTransaction, Order, PaymentConfig, ResellerStaff, Ticket,
    TicketTier,
};

/// The engine's entire mutable state, every table from the relational layout
/// as a map keyed by id.
///
/// The whole struct sits behind one mutex (see [`crate::engine::Engine`]);
/// each engine operation runs inside a single critical section, so a
/// multi-row update (bundle reservation, settlement) is one serializable
/// transaction and partial writes are never observable from outside.
#[derive(Debug, Default)]
pub struct EngineState {
    pub tiers: HashMap<Uuid, TicketTier>,
    pub bundles: HashMap<Uuid, Bundle>,
    /// Keyed by event id; exactly one config per event.
    pub payment_configs: HashMap<Uuid, PaymentConfig>,
    /// Keyed by organizer id; created lazily on first activity.
    pub credit_accounts: HashMap<Uuid, CreditAccount>,
    /// Append-only.
    pub credit_transactions: Vec<CreditTransaction>,
    /// External payment reference -> index into `credit_transactions`.
    /// References are unique platform-wide, so replay detection is one
    /// lookup rather than a log scan.
    pub credit_refs: HashMap<String, usize>,
    pub orders: HashMap<Uuid, Order>,
    pub tickets: HashMap<Uuid, Ticket>,
    /// Ticket code -> ticket id; codes are unique platform-wide.
    pub tickets_by_code: HashMap<String, Uuid>,
    pub staff: HashMap<Uuid, ResellerStaff>,
    /// (event id, referral code) -> staff id; codes are unique per event.
    pub referral_codes: HashMap<(Uuid, String), Uuid>,
    /// Commission ledger keyed by order id. Presence of a key (even with an
    /// empty vec) means attribution already ran, making re-runs no-ops.
    pub commission_postings: HashMap<Uuid, Vec<CommissionPosting>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, id: Uuid) -> Result<&TicketTier, EngineError> {
        self.tiers
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("tier {id}")))
    }

    pub fn tier_mut(&mut self, id: Uuid) -> Result<&mut TicketTier, EngineError> {
        self.tiers
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("tier {id}")))
    }

    pub fn bundle(&self, id: Uuid) -> Result<&Bundle, EngineError> {
        self.bundles
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("bundle {id}")))
    }

    pub fn order_mut(&mut self, id: Uuid) -> Result<&mut Order, EngineError> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("order {id}")))
    }

    pub fn payment_config(&self, event_id: Uuid) -> Result<&PaymentConfig, EngineError> {
        self.payment_configs
            .get(&event_id)
            .ok_or(EngineError::FeeConfigMissing(event_id))
    }
}
