use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::payment::PaymentModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Refunded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    PendingActivation,
    Valid,
    Scanned,
    Cancelled,
    Refunded,
}

/// A requested order line: either a direct tier purchase or a bundle
/// purchase. Resolved once at the boundary and carried as a closed union
/// from there on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderLine {
    Tier { tier_id: Uuid, quantity: u32 },
    Bundle { bundle_id: Uuid, quantity: u32 },
}

impl OrderLine {
    pub fn quantity(&self) -> u32 {
        match self {
            OrderLine::Tier { quantity, .. } | OrderLine::Bundle { quantity, .. } => *quantity,
        }
    }
}

/// An order line after price resolution, as persisted on the order.
/// `ticket_quantity` is the number of tickets this line mints (for bundle
/// lines: units bought x sum of member quantities).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedLine {
    pub line: OrderLine,
    pub unit_price_cents: i64,
    pub ticket_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub event_id: Uuid,
    pub lines: Vec<PricedLine>,
    pub payment_model: PaymentModel,
    pub subtotal_cents: i64,
    pub platform_fee_cents: i64,
    pub processing_fee_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub referral_code: Option<String>,
    pub deferred_activation: bool,
    /// Credits debited at creation for PREPAID orders, zero for CARD.
    pub credits_debited: u32,
    pub ticket_quantity: u32,
    pub external_payment_ref: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ticket per reserved unit, minted when the order completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub tier_id: Uuid,
    pub status: TicketStatus,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
