//! Settlement orchestrator: the order/ticket state machine.
//!
//! `create` sequences price resolution, inventory reservation, fee
//! computation or credit debit, and persists the order; `confirm` completes
//! it, mints tickets and triggers commission attribution; `cancel` and
//! `refund` unwind it. Each public operation is one critical section on the
//! engine state, so the whole sequence is atomic with respect to every
//! other caller.
//!
//! Legal transitions: PENDING -> COMPLETED, PENDING -> CANCELLED,
//! COMPLETED -> REFUNDED.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::store::EngineState;
use crate::engine::{bundles, commission, credits, fees, tiers, Engine, EngineError};
use crate::models::{
    Order, OrderLine, OrderStatus, PaymentModel, PricedLine, Ticket, TicketStatus,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub event_id: Uuid,
    pub items: Vec<OrderLine>,
    pub referral_code: Option<String>,
    /// Door-sale flows mint tickets in PENDING_ACTIVATION instead of VALID.
    #[serde(default)]
    pub deferred_activation: bool,
}

/// Result of `create`: the persisted order, plus tickets when the order
/// completed immediately (PREPAID).
#[derive(Debug, Clone)]
pub struct CreateOrderOutcome {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

/// Reservations applied so far within one `create` attempt, for rollback.
enum Applied {
    Tier { tier_id: Uuid, quantity: u32 },
    Bundle { bundle_id: Uuid, units: u32 },
}

fn roll_back(state: &mut EngineState, applied: Vec<Applied>) {
    for entry in applied.into_iter().rev() {
        let result = match entry {
            Applied::Tier { tier_id, quantity } => tiers::release(state, tier_id, quantity),
            Applied::Bundle { bundle_id, units } => bundles::release_bundle(state, bundle_id, units),
        };
        if let Err(err) = result {
            // Rows we just reserved cannot vanish mid-lock; log and move on.
            tracing::error!(error = %err, "rollback release failed");
        }
    }
}

fn release_order_inventory(state: &mut EngineState, order: &Order) -> Result<(), EngineError> {
    for priced in &order.lines {
        match priced.line {
            OrderLine::Tier { tier_id, quantity } => tiers::release(state, tier_id, quantity)?,
            OrderLine::Bundle { bundle_id, quantity } => {
                bundles::release_bundle(state, bundle_id, quantity)?
            }
        }
    }
    Ok(())
}

pub fn create_order(
    state: &mut EngineState,
    req: CreateOrderRequest,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<CreateOrderOutcome, EngineError> {
    if req.items.is_empty() {
        return Err(EngineError::Validation("order has no line items".into()));
    }
    if req.items.iter().any(|item| item.quantity() == 0) {
        return Err(EngineError::Validation("line quantity must be positive".into()));
    }

    let config = state.payment_config(req.event_id)?.clone();

    // Resolve every line's price and ticket yield before touching counters.
    let mut lines: Vec<PricedLine> = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let priced = match *item {
            OrderLine::Tier { tier_id, quantity } => {
                let tier = state.tier(tier_id)?;
                if tier.event_id != req.event_id {
                    return Err(EngineError::Validation(format!(
                        "tier {tier_id} does not belong to event {}",
                        req.event_id
                    )));
                }
                PricedLine {
                    line: item.clone(),
                    unit_price_cents: tiers::resolve_price(tier, now).current_price_cents,
                    ticket_quantity: quantity,
                }
            }
            OrderLine::Bundle { bundle_id, quantity } => {
                let bundle = state.bundle(bundle_id)?;
                let ticket_quantity =
                    bundle.units_per_bundle().checked_mul(quantity).ok_or_else(|| {
                        EngineError::Validation(format!(
                            "quantity {quantity} overflows ticket yield for bundle {bundle_id}"
                        ))
                    })?;
                PricedLine {
                    line: item.clone(),
                    unit_price_cents: bundle.price_cents,
                    ticket_quantity,
                }
            }
        };
        lines.push(priced);
    }

    let subtotal_cents: i64 = lines
        .iter()
        .map(|l| l.unit_price_cents * i64::from(l.line.quantity()))
        .sum();
    let ticket_quantity = lines
        .iter()
        .try_fold(0u32, |acc, l| acc.checked_add(l.ticket_quantity))
        .ok_or_else(|| {
            EngineError::Validation("order ticket quantity overflows".into())
        })?;

    // Reserve line by line; any failure releases what this call reserved.
    let mut applied: Vec<Applied> = Vec::with_capacity(lines.len());
    for priced in &lines {
        let result = match priced.line {
            OrderLine::Tier { tier_id, quantity } => tiers::reserve(state, tier_id, quantity)
                .map(|()| Applied::Tier { tier_id, quantity }),
            OrderLine::Bundle { bundle_id, quantity } => {
                bundles::reserve_bundle(state, bundle_id, quantity).map(|()| Applied::Bundle {
                    bundle_id,
                    units: quantity,
                })
            }
        };
        match result {
            Ok(entry) => applied.push(entry),
            Err(err) => {
                roll_back(state, applied);
                return Err(err);
            }
        }
    }

    let fee_breakdown = fees::compute(subtotal_cents, &config);

    // PREPAID settlement debits one credit per ticket instead of charging
    // fees; an insufficient balance unwinds the reservations made above.
    let mut credits_debited = 0;
    if config.model == PaymentModel::Prepaid {
        if let Err(err) = credits::debit(state, config.organizer_id, ticket_quantity, now) {
            roll_back(state, applied);
            return Err(err);
        }
        credits_debited = ticket_quantity;
    }

    let order = Order {
        id: Uuid::new_v4(),
        event_id: req.event_id,
        lines,
        payment_model: config.model,
        subtotal_cents,
        platform_fee_cents: fee_breakdown.platform_fee_cents,
        processing_fee_cents: fee_breakdown.processing_fee_cents,
        total_cents: fee_breakdown.total_cents,
        status: OrderStatus::Pending,
        referral_code: req.referral_code,
        deferred_activation: req.deferred_activation,
        credits_debited,
        ticket_quantity,
        external_payment_ref: None,
        expires_at: now + ttl,
        created_at: now,
        updated_at: now,
    };
    let order_id = order.id;
    state.orders.insert(order_id, order);
    tracing::info!(%order_id, subtotal_cents, ticket_quantity, model = ?config.model, "order created");

    // PREPAID orders need no external confirmation signal: the credits are
    // already debited, so the order completes in the same transaction.
    let tickets = if config.model == PaymentModel::Prepaid {
        complete_order(state, order_id, now)?
    } else {
        Vec::new()
    };

    let order = state
        .orders
        .get(&order_id)
        .cloned()
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
    Ok(CreateOrderOutcome { order, tickets })
}

/// Transition PENDING -> COMPLETED: mint one ticket per reserved unit and
/// run commission attribution in the same transaction.
fn complete_order(
    state: &mut EngineState,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>, EngineError> {
    let (deferred, lines) = {
        let order = state.order_mut(order_id)?;
        order.status = OrderStatus::Completed;
        order.updated_at = now;
        (order.deferred_activation, order.lines.clone())
    };
    let status = if deferred {
        TicketStatus::PendingActivation
    } else {
        TicketStatus::Valid
    };

    // (tier_id, count) per line, owned, so minting can borrow state again.
    let mut mint_plan: Vec<(Uuid, u32)> = Vec::new();
    for priced in &lines {
        match priced.line {
            OrderLine::Tier { tier_id, quantity } => mint_plan.push((tier_id, quantity)),
            OrderLine::Bundle { bundle_id, quantity } => {
                if let Some(bundle) = state.bundles.get(&bundle_id) {
                    for member in &bundle.included_tiers {
                        let count = member.quantity.checked_mul(quantity).ok_or_else(|| {
                            EngineError::Validation(format!(
                                "quantity {quantity} overflows ticket yield for bundle {bundle_id}"
                            ))
                        })?;
                        mint_plan.push((member.tier_id, count));
                    }
                }
            }
        }
    }

    let mut tickets = Vec::new();
    for (tier_id, count) in mint_plan {
        for _ in 0..count {
            let ticket = Ticket {
                id: Uuid::new_v4(),
                order_id,
                tier_id,
                status,
                code: Uuid::new_v4().simple().to_string(),
                created_at: now,
                updated_at: now,
            };
            state.tickets_by_code.insert(ticket.code.clone(), ticket.id);
            state.tickets.insert(ticket.id, ticket.clone());
            tickets.push(ticket);
        }
    }

    commission::attribute(state, order_id, now)?;
    tracing::info!(%order_id, tickets = tickets.len(), "order completed");
    Ok(tickets)
}

pub fn confirm_order(
    state: &mut EngineState,
    order_id: Uuid,
    external_payment_ref: Option<String>,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>, EngineError> {
    let (status, expires_at, payment_model) = {
        let order = state.order_mut(order_id)?;
        (order.status, order.expires_at, order.payment_model)
    };
    if status != OrderStatus::Pending {
        return Err(EngineError::InvalidState(format!(
            "confirm requires a pending order, order {order_id} is {status:?}"
        )));
    }

    // An order past its expiry window is auto-cancelled, then rejected.
    if now > expires_at {
        cancel_order(state, order_id, now)?;
        return Err(EngineError::StaleOrder(order_id));
    }

    if payment_model == PaymentModel::Card {
        let Some(reference) = external_payment_ref else {
            return Err(EngineError::Validation(
                "card orders require an external payment reference".into(),
            ));
        };
        state.order_mut(order_id)?.external_payment_ref = Some(reference);
    }

    complete_order(state, order_id, now)
}

pub fn cancel_order(
    state: &mut EngineState,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Order, EngineError> {
    let order = state.order_mut(order_id)?;
    if order.status != OrderStatus::Pending {
        return Err(EngineError::InvalidState(format!(
            "cancel requires a pending order, order {order_id} is {:?}",
            order.status
        )));
    }
    let order = order.clone();

    release_order_inventory(state, &order)?;
    if order.credits_debited > 0 {
        let organizer_id = state.payment_config(order.event_id)?.organizer_id;
        credits::credit_back(state, organizer_id, order.credits_debited, now);
    }

    let order = state.order_mut(order_id)?;
    order.status = OrderStatus::Cancelled;
    order.updated_at = now;
    tracing::info!(%order_id, "order cancelled");
    Ok(order.clone())
}

/// COMPLETED -> REFUNDED. Blocked while any minted ticket is already
/// scanned. Reverses the credit debit but deliberately leaves `sold`
/// counters alone: they are a historical ledger, not a live availability
/// counter.
pub fn refund_order(
    state: &mut EngineState,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Order, EngineError> {
    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
    if order.status != OrderStatus::Completed {
        return Err(EngineError::InvalidState(format!(
            "refund requires a completed order, order {order_id} is {:?}",
            order.status
        )));
    }

    let scanned = state
        .tickets
        .values()
        .any(|t| t.order_id == order_id && t.status == TicketStatus::Scanned);
    if scanned {
        return Err(EngineError::RefundBlocked(format!(
            "order {order_id} has a scanned ticket"
        )));
    }

    let credits_debited = order.credits_debited;
    let event_id = order.event_id;

    for ticket in state.tickets.values_mut().filter(|t| t.order_id == order_id) {
        ticket.status = TicketStatus::Refunded;
        ticket.updated_at = now;
    }
    if credits_debited > 0 {
        let organizer_id = state.payment_config(event_id)?.organizer_id;
        credits::credit_back(state, organizer_id, credits_debited, now);
    }

    let order = state.order_mut(order_id)?;
    order.status = OrderStatus::Refunded;
    order.updated_at = now;
    tracing::info!(%order_id, "order refunded");
    Ok(order.clone())
}

/// Caller-driven sweep: cancel every PENDING order whose expiry window has
/// passed, releasing its inventory and credits. Returns the cancelled ids.
pub fn expire_pending(state: &mut EngineState, now: DateTime<Utc>) -> Vec<Uuid> {
    let expired: Vec<Uuid> = state
        .orders
        .values()
        .filter(|o| o.status == OrderStatus::Pending && now > o.expires_at)
        .map(|o| o.id)
        .collect();
    for order_id in &expired {
        if let Err(err) = cancel_order(state, *order_id, now) {
            tracing::error!(%order_id, error = %err, "failed to expire pending order");
        }
    }
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "expired pending orders");
    }
    expired
}

fn ticket_by_code_mut<'a>(
    state: &'a mut EngineState,
    code: &str,
) -> Result<&'a mut Ticket, EngineError> {
    let ticket_id = *state
        .tickets_by_code
        .get(code)
        .ok_or_else(|| EngineError::NotFound(format!("ticket {code}")))?;
    state
        .tickets
        .get_mut(&ticket_id)
        .ok_or_else(|| EngineError::NotFound(format!("ticket {code}")))
}

pub fn scan_ticket(
    state: &mut EngineState,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Ticket, EngineError> {
    let ticket = ticket_by_code_mut(state, code)?;
    if ticket.status != TicketStatus::Valid {
        return Err(EngineError::InvalidState(format!(
            "ticket {code} is {:?}, only valid tickets can be scanned",
            ticket.status
        )));
    }
    ticket.status = TicketStatus::Scanned;
    ticket.updated_at = now;
    tracing::info!(ticket_id = %ticket.id, "ticket scanned");
    Ok(ticket.clone())
}

pub fn activate_ticket(
    state: &mut EngineState,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Ticket, EngineError> {
    let ticket = ticket_by_code_mut(state, code)?;
    if ticket.status != TicketStatus::PendingActivation {
        return Err(EngineError::InvalidState(format!(
            "ticket {code} is {:?}, only pending-activation tickets can be activated",
            ticket.status
        )));
    }
    ticket.status = TicketStatus::Valid;
    ticket.updated_at = now;
    tracing::info!(ticket_id = %ticket.id, "ticket activated");
    Ok(ticket.clone())
}

impl Engine {
    pub fn create_order(
        &self,
        req: CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<CreateOrderOutcome, EngineError> {
        let ttl = self.pending_order_ttl();
        create_order(&mut self.lock(), req, now, ttl)
    }

    pub fn confirm_order(
        &self,
        order_id: Uuid,
        external_payment_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, EngineError> {
        confirm_order(&mut self.lock(), order_id, external_payment_ref, now)
    }

    pub fn cancel_order(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, EngineError> {
        cancel_order(&mut self.lock(), order_id, now)
    }

    pub fn refund_order(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, EngineError> {
        refund_order(&mut self.lock(), order_id, now)
    }

    pub fn expire_pending_orders(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        expire_pending(&mut self.lock(), now)
    }

    pub fn scan_ticket(&self, code: &str, now: DateTime<Utc>) -> Result<Ticket, EngineError> {
        scan_ticket(&mut self.lock(), code, now)
    }

    pub fn activate_ticket(&self, code: &str, now: DateTime<Utc>) -> Result<Ticket, EngineError> {
        activate_ticket(&mut self.lock(), code, now)
    }
}
