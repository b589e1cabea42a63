use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    TeamMember,
    Associate,
    DoorStaff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    /// `commission_value` is a whole percentage of the sale subtotal.
    Percentage,
    /// `commission_value` is cents per ticket sold.
    Fixed,
}

/// A reseller attached to an event, part of a flat parent-linked hierarchy.
///
/// Commission values are independent per-level configuration: a parent's
/// override is whatever the organizer set on that parent's record, never a
/// remainder derived from the child's rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResellerStaff {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub parent_id: Option<Uuid>,
    pub hierarchy_level: u32,
    pub allocated_tickets: u32,
    pub tickets_sold: u32,
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
    pub commission_earned_cents: i64,
    pub referral_code: String,
    pub can_assign_sub_sellers: bool,
    pub max_sub_sellers: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
