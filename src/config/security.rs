use axum::http::{HeaderName, HeaderValue, Request, Response};
use std::env;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Blanket headers for a JSON API whose responses carry order and
/// ticket state: never framed, never cached, never sniffed.
fn baseline_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ),
        (
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ),
        (
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ),
        (
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store"),
        ),
    ]
}

/// Applies a fixed header set to every response. The set is built once
/// at startup so the per-response path is a plain iteration, no parsing.
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        let mut headers = baseline_headers();
        if include_hsts {
            headers.push((
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            ));
        }
        Self {
            headers: headers.into(),
        }
    }

    /// HSTS only makes sense behind TLS, so it is gated on RUST_ENV.
    pub fn from_env() -> Self {
        let production = env::var("RUST_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        tracing::debug!(hsts = production, "security headers configured");
        Self::new(production)
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            headers: Arc::clone(&self.headers),
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        this.future.poll(cx).map_ok(|mut response| {
            for (name, value) in this.headers.iter() {
                response.headers_mut().insert(name.clone(), value.clone());
            }
            response
        })
    }
}

pub fn create_security_headers_layer() -> SecurityHeadersLayer {
    SecurityHeadersLayer::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_header(layer: &SecurityHeadersLayer, name: &str) -> bool {
        layer.headers.iter().any(|(n, _)| n.as_str() == name)
    }

    #[test]
    fn baseline_omits_hsts() {
        let layer = SecurityHeadersLayer::new(false);
        assert!(has_header(&layer, "cache-control"));
        assert!(has_header(&layer, "x-frame-options"));
        assert!(!has_header(&layer, "strict-transport-security"));
    }

    #[test]
    fn production_mode_adds_hsts() {
        let layer = SecurityHeadersLayer::new(true);
        assert!(has_header(&layer, "strict-transport-security"));
    }
}
