use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleKind {
    SingleEvent,
    MultiEvent,
}

/// One member slice of a bundle: buying a bundle unit reserves `quantity`
/// on this tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleTier {
    pub tier_id: Uuid,
    pub event_id: Uuid,
    pub quantity: u32,
}

/// A purchasable unit that atomically grants units across one or several
/// tiers, typically at a discount against `regular_price_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub name: String,
    pub kind: BundleKind,
    pub included_tiers: Vec<BundleTier>,
    pub total_quantity: u32,
    pub sold: u32,
    pub price_cents: i64,
    pub regular_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bundle {
    /// Ticket units minted per purchased bundle unit (sum over members).
    pub fn units_per_bundle(&self) -> u32 {
        self.included_tiers.iter().map(|t| t.quantity).sum()
    }
}
