use axum::http::{header, HeaderName, HeaderValue, Method};
use std::env;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

const ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
const DEV_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];

/// GET and POST only; every mutation in the API is a POST.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn allowed_origins() -> AllowOrigin {
    let configured = env::var(ORIGINS_ENV).unwrap_or_else(|_| DEV_ORIGINS.join(","));
    let origins = parse_origins(&configured);

    if origins.is_empty() {
        // A wildcard would trip tower-http's credentials check, so fall
        // back to the development list instead.
        tracing::warn!("no valid CORS origins configured, using development defaults");
        AllowOrigin::list(DEV_ORIGINS.iter().map(|o| HeaderValue::from_static(o)))
    } else {
        tracing::info!(count = origins.len(), "CORS origins configured");
        AllowOrigin::list(origins)
    }
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin, %err, "ignoring malformed CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_origins() {
        let origins = parse_origins("http://a.example, http://b.example");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://a.example");
    }

    #[test]
    fn skips_blank_and_malformed_entries() {
        let origins = parse_origins(" , http://ok.example ,\u{0}bad");
        assert_eq!(origins.len(), 1);
    }

    #[test]
    fn layer_builds_with_defaults() {
        let _layer = create_cors_layer();
    }

    #[test]
    fn development_defaults_are_valid_origins() {
        assert_eq!(parse_origins(&DEV_ORIGINS.join(",")).len(), DEV_ORIGINS.len());
    }
}
