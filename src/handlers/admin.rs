//! Organizer setup surface: payment configs, tiers, bundles, reseller
//! staff and credit operations. Kept apart from the purchase routes,
//! which are the only surface buyers ever touch.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{NewBundle, NewPaymentConfig, NewStaff, NewTier};
use crate::handlers::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_payment_config(
    State(engine): State<AppState>,
    Json(req): Json<NewPaymentConfig>,
) -> Result<Response, AppError> {
    let config = engine.create_payment_config(req)?;
    Ok(created(config, "Payment config created").into_response())
}

pub async fn create_tier(
    State(engine): State<AppState>,
    Json(req): Json<NewTier>,
) -> Result<Response, AppError> {
    let tier = engine.create_tier(req, Utc::now())?;
    Ok(created(tier, "Tier created").into_response())
}

pub async fn create_bundle(
    State(engine): State<AppState>,
    Json(req): Json<NewBundle>,
) -> Result<Response, AppError> {
    let bundle = engine.create_bundle(req, Utc::now())?;
    Ok(created(bundle, "Bundle created").into_response())
}

pub async fn create_staff(
    State(engine): State<AppState>,
    Json(req): Json<NewStaff>,
) -> Result<Response, AppError> {
    let staff = engine.create_staff(req, Utc::now())?;
    Ok(created(staff, "Staff created").into_response())
}

#[derive(Deserialize)]
pub struct BonusRequest {
    pub organizer_id: Uuid,
    pub amount: u32,
}

pub async fn grant_bonus(
    State(engine): State<AppState>,
    Json(req): Json<BonusRequest>,
) -> Result<Response, AppError> {
    let account = engine.grant_first_event_bonus(req.organizer_id, req.amount, Utc::now());
    Ok(success(account, "Bonus processed").into_response())
}

#[derive(Deserialize)]
pub struct PurchaseCreditsRequest {
    pub organizer_id: Uuid,
    pub tickets_granted: u32,
    pub amount_paid_cents: i64,
    pub external_ref: String,
}

pub async fn purchase_credits(
    State(engine): State<AppState>,
    Json(req): Json<PurchaseCreditsRequest>,
) -> Result<Response, AppError> {
    let transaction = engine.purchase_credits(
        req.organizer_id,
        req.tickets_granted,
        req.amount_paid_cents,
        req.external_ref,
        Utc::now(),
    )?;
    Ok(created(transaction, "Credits purchased").into_response())
}

pub async fn credit_balance(
    State(engine): State<AppState>,
    Path(organizer_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let account = engine
        .credit_account(organizer_id)
        .ok_or_else(|| AppError::NotFound(format!("credit account for {organizer_id}")))?;
    Ok(success(account, "Balance fetched").into_response())
}
