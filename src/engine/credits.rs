//! Prepaid credit ledger: one account per organizer, append-only
//! transaction history, and the debit/credit-back pair the PREPAID
//! settlement path runs through.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::store::EngineState;
use crate::engine::{Engine, EngineError};
use crate::models::{CreditAccount, CreditTransaction, CreditTransactionStatus};

/// Fetch the organizer's account, creating it on first touch.
pub fn account_mut(state: &mut EngineState, organizer_id: Uuid, now: DateTime<Utc>) -> &mut CreditAccount {
    state
        .credit_accounts
        .entry(organizer_id)
        .or_insert_with(|| CreditAccount {
            organizer_id,
            credits_total: 0,
            credits_used: 0,
            first_bonus_granted: false,
            created_at: now,
            updated_at: now,
        })
}

/// Grant the one-time first-event bonus. A second call for the same
/// organizer is a no-op and returns the account unchanged.
pub fn grant_first_event_bonus(
    state: &mut EngineState,
    organizer_id: Uuid,
    amount: u32,
    now: DateTime<Utc>,
) -> CreditAccount {
    let account = account_mut(state, organizer_id, now);
    if account.first_bonus_granted {
        return account.clone();
    }
    account.credits_total += amount;
    account.first_bonus_granted = true;
    account.updated_at = now;
    let snapshot = account.clone();

    state.credit_transactions.push(CreditTransaction {
        id: Uuid::new_v4(),
        organizer_id,
        tickets_granted: amount,
        amount_paid_cents: 0,
        price_per_ticket_cents: 0,
        external_ref: None,
        status: CreditTransactionStatus::Completed,
        created_at: now,
    });
    tracing::info!(%organizer_id, amount, "first-event bonus granted");
    snapshot
}

/// Record a credit purchase. Idempotent on `external_ref`: replaying the
/// same payment reference returns the original transaction without
/// crediting again.
pub fn purchase_credits(
    state: &mut EngineState,
    organizer_id: Uuid,
    tickets_granted: u32,
    amount_paid_cents: i64,
    external_ref: String,
    now: DateTime<Utc>,
) -> Result<CreditTransaction, EngineError> {
    if tickets_granted == 0 {
        return Err(EngineError::Validation(
            "credit purchase must grant at least one ticket".into(),
        ));
    }
    if amount_paid_cents < 0 {
        return Err(EngineError::Validation("amount paid must be non-negative".into()));
    }

    // References are unique across the platform, not per organizer, so a
    // replayed webhook hits the index no matter which account it names.
    if let Some(&index) = state.credit_refs.get(&external_ref) {
        tracing::debug!(%external_ref, "duplicate credit purchase ignored");
        return Ok(state.credit_transactions[index].clone());
    }

    let account = account_mut(state, organizer_id, now);
    account.credits_total += tickets_granted;
    account.updated_at = now;

    let transaction = CreditTransaction {
        id: Uuid::new_v4(),
        organizer_id,
        tickets_granted,
        amount_paid_cents,
        price_per_ticket_cents: amount_paid_cents / i64::from(tickets_granted),
        external_ref: Some(external_ref.clone()),
        status: CreditTransactionStatus::Completed,
        created_at: now,
    };
    state
        .credit_refs
        .insert(external_ref, state.credit_transactions.len());
    state.credit_transactions.push(transaction.clone());
    tracing::info!(%organizer_id, tickets_granted, amount_paid_cents, "credits purchased");
    Ok(transaction)
}

/// Debit one credit per ticket. Fails without side effects when the balance
/// cannot cover the quantity.
pub fn debit(
    state: &mut EngineState,
    organizer_id: Uuid,
    ticket_quantity: u32,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let account = account_mut(state, organizer_id, now);
    let remaining = account.credits_remaining();
    if ticket_quantity > remaining {
        return Err(EngineError::InsufficientCredits {
            needed: ticket_quantity,
            remaining,
        });
    }
    account.credits_used += ticket_quantity;
    account.updated_at = now;
    tracing::debug!(%organizer_id, ticket_quantity, used = account.credits_used, "credits debited");
    Ok(())
}

/// Reverse a debit on cancellation or refund. Floored at zero.
pub fn credit_back(
    state: &mut EngineState,
    organizer_id: Uuid,
    ticket_quantity: u32,
    now: DateTime<Utc>,
) {
    let account = account_mut(state, organizer_id, now);
    account.credits_used = account.credits_used.saturating_sub(ticket_quantity);
    account.updated_at = now;
    tracing::debug!(%organizer_id, ticket_quantity, used = account.credits_used, "credits returned");
}

impl Engine {
    pub fn grant_first_event_bonus(
        &self,
        organizer_id: Uuid,
        amount: u32,
        now: DateTime<Utc>,
    ) -> CreditAccount {
        grant_first_event_bonus(&mut self.lock(), organizer_id, amount, now)
    }

    pub fn purchase_credits(
        &self,
        organizer_id: Uuid,
        tickets_granted: u32,
        amount_paid_cents: i64,
        external_ref: String,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction, EngineError> {
        purchase_credits(
            &mut self.lock(),
            organizer_id,
            tickets_granted,
            amount_paid_cents,
            external_ref,
            now,
        )
    }
}
