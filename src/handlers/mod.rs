use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::Engine;
use crate::utils::response::success;

pub mod admin;
pub mod orders;
pub mod tickets;
pub mod tiers;

pub type AppState = Arc<Engine>;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "tessera-api",
    };

    success(payload, "Health check successful").into_response()
}
