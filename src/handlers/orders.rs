use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::settlement::CreateOrderRequest;
use crate::handlers::AppState;
use crate::models::{Order, OrderStatus, Ticket, TicketStatus};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

/// Wire shape of an order: the checkout-facing fields, nothing internal.
#[derive(Serialize)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub subtotal_cents: i64,
    pub platform_fee_cents: i64,
    pub processing_fee_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            event_id: order.event_id,
            subtotal_cents: order.subtotal_cents,
            platform_fee_cents: order.platform_fee_cents,
            processing_fee_cents: order.processing_fee_cents,
            total_cents: order.total_cents,
            status: order.status,
        }
    }
}

#[derive(Serialize)]
pub struct TicketSummary {
    pub id: Uuid,
    pub code: String,
    pub status: TicketStatus,
}

impl From<&Ticket> for TicketSummary {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            code: ticket.code.clone(),
            status: ticket.status,
        }
    }
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub tickets: Vec<TicketSummary>,
}

pub async fn create(
    State(engine): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, AppError> {
    let outcome = engine.create_order(req, Utc::now())?;
    let body = CreateOrderResponse {
        order: OrderSummary::from(&outcome.order),
        tickets: outcome.tickets.iter().map(TicketSummary::from).collect(),
    };
    Ok(created(body, "Order created").into_response())
}

#[derive(Deserialize, Default)]
pub struct ConfirmRequest {
    pub external_payment_ref: Option<String>,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub tickets: Vec<TicketSummary>,
}

pub async fn confirm(
    State(engine): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    let tickets = engine.confirm_order(order_id, req.external_payment_ref, Utc::now())?;
    let body = ConfirmResponse {
        tickets: tickets.iter().map(TicketSummary::from).collect(),
    };
    Ok(success(body, "Order confirmed").into_response())
}

pub async fn cancel(
    State(engine): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let order = engine.cancel_order(order_id, Utc::now())?;
    Ok(success(OrderSummary::from(&order), "Order cancelled").into_response())
}

pub async fn refund(
    State(engine): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let order = engine.refund_order(order_id, Utc::now())?;
    Ok(success(OrderSummary::from(&order), "Order refunded").into_response())
}

#[derive(Serialize)]
pub struct ExpireResponse {
    pub expired_order_ids: Vec<Uuid>,
}

/// Caller-driven sweep over PENDING orders past their expiry window.
pub async fn expire(State(engine): State<AppState>) -> Result<Response, AppError> {
    let expired_order_ids = engine.expire_pending_orders(Utc::now());
    Ok(success(ExpireResponse { expired_order_ids }, "Expiry sweep complete").into_response())
}
