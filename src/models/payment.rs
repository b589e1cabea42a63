use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How sales against an event are monetized. The two models are mutually
/// exclusive per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentModel {
    /// Organizer pre-buys credits; one credit per issued ticket, no fees.
    Prepaid,
    /// Each transaction incurs a platform fee and a processing fee.
    Card,
}

/// Per-event fee configuration. Exactly one per event, set at event setup
/// and never mutated afterwards (orders snapshot the computed fees anyway).
///
/// Percent fields are whole percentages (3.7 means 3.7%), fixed fields are
/// integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub event_id: Uuid,
    pub organizer_id: Uuid,
    pub model: PaymentModel,
    pub platform_fee_percent: Decimal,
    pub platform_fee_fixed_cents: i64,
    pub processing_fee_percent: Decimal,
    pub processing_fee_fixed_cents: i64,
    pub charity_discount: bool,
}
