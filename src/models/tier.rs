use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a tier's time-windowed pricing schedule.
///
/// Windows are half-open: a window covers `available_from <= t < available_until`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingWindow {
    pub price_cents: i64,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
}

/// A priced, capacity-bounded class of ticket for one event.
///
/// `sold` is a historical ledger: it only moves down when a still-pending
/// order is cancelled, never when a completed order is refunded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price_cents: i64,
    pub quantity: u32,
    pub sold: u32,
    pub pricing_schedule: Vec<PricingWindow>,
    pub is_table_package: bool,
    pub table_capacity: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketTier {
    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.sold)
    }
}
