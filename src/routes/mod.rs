use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, health_check, orders, tickets, tiers, AppState};

pub fn create_routes(engine: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tiers/:id/price", get(tiers::quote_price))
        .route("/orders", post(orders::create))
        .route("/orders/expire", post(orders::expire))
        .route("/orders/:id/confirm", post(orders::confirm))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/orders/:id/refund", post(orders::refund))
        .route("/tickets/:code/scan", post(tickets::scan))
        .route("/tickets/:code/activate", post(tickets::activate))
        .nest("/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(engine)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/payment-configs", post(admin::create_payment_config))
        .route("/tiers", post(admin::create_tier))
        .route("/bundles", post(admin::create_bundle))
        .route("/staff", post(admin::create_staff))
        .route("/credits/bonus", post(admin::grant_bonus))
        .route("/credits/purchase", post(admin::purchase_credits))
        .route("/credits/:organizer_id", get(admin::credit_balance))
}
