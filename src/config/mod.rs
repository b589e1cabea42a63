use std::env;

use chrono::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_PENDING_ORDER_TTL_SECS: i64 = 15 * 60;

pub struct Config {
    pub port: u16,
    /// How long a PENDING order may wait for payment confirmation before the
    /// expiry sweep cancels it and releases its inventory.
    pub pending_order_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let ttl_secs = env::var("PENDING_ORDER_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&secs: &i64| secs > 0)
            .unwrap_or(DEFAULT_PENDING_ORDER_TTL_SECS);

        Self {
            port,
            pending_order_ttl: Duration::seconds(ttl_secs),
        }
    }
}
