use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::handlers::orders::TicketSummary;
use crate::handlers::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn scan(
    State(engine): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let ticket = engine.scan_ticket(&code, Utc::now())?;
    Ok(success(TicketSummary::from(&ticket), "Ticket scanned").into_response())
}

pub async fn activate(
    State(engine): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let ticket = engine.activate_ticket(&code, Utc::now())?;
    Ok(success(TicketSummary::from(&ticket), "Ticket activated").into_response())
}
