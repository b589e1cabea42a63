use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prepaid credit balance for one organizer. Created lazily on first
/// activity; the first-event bonus is granted at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub organizer_id: Uuid,
    pub credits_total: u32,
    pub credits_used: u32,
    pub first_bonus_granted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    pub fn credits_remaining(&self) -> u32 {
        self.credits_total.saturating_sub(self.credits_used)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionStatus {
    Pending,
    Completed,
}

/// Append-only record of a credit grant or purchase. Bonus grants carry
/// `amount_paid_cents = 0` and no external reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub tickets_granted: u32,
    pub amount_paid_cents: i64,
    pub price_per_ticket_cents: i64,
    pub external_ref: Option<String>,
    pub status: CreditTransactionStatus,
    pub created_at: DateTime<Utc>,
}
