use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
pub struct PriceQuery {
    /// Defaults to the current time when absent.
    pub at: Option<DateTime<Utc>>,
}

pub async fn quote_price(
    State(engine): State<AppState>,
    Path(tier_id): Path<Uuid>,
    Query(query): Query<PriceQuery>,
) -> Result<Response, AppError> {
    let at = query.at.unwrap_or_else(Utc::now);
    let quote = engine.quote_price(tier_id, at)?;
    Ok(success(quote, "Price resolved").into_response())
}
