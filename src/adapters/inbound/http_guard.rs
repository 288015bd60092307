//! HTTP Guard
//!
//! axum glue for [`GeoGuard`]: builds the resolver's view of a request and
//! turns denials into responses.

use crate::application::GeoGuard;
use crate::domain::entities::{RequestInfo, Target};
use crate::domain::errors::CountryNotAllowed;
use crate::domain::services::{CDN_COUNTRY_HEADERS, TRUST_HEADERS};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;

/// JSON body sent to a denied client.
#[derive(Debug, Serialize)]
pub struct DenyBody {
    pub success: bool,
    pub error: bool,
    pub message: String,
    pub country: Option<String>,
    pub allowed_countries: Vec<String>,
}

/// Copy the trust and CDN headers of an HTTP request.
///
/// Other headers are never consulted by the resolver.
pub fn request_info(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestInfo {
    let mut info = RequestInfo::new(peer.map(|addr| addr.ip()));

    for name in TRUST_HEADERS.iter().chain(CDN_COUNTRY_HEADERS.iter()) {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            info.insert_header(name, value);
        }
    }
    info
}

/// Map a configured status code, falling back to 403 for unusable values.
pub fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::FORBIDDEN)
}

/// Render a denial the way the guard is configured to.
pub fn deny_response(guard: &GeoGuard, denial: CountryNotAllowed) -> Response {
    let status = status_code(denial.code);

    if guard.response().json_response {
        let body = DenyBody {
            success: false,
            error: true,
            message: denial.message,
            country: denial.detected_country,
            allowed_countries: denial.allowed_countries,
        };
        (status, Json(body)).into_response()
    } else {
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            denial.message,
        )
            .into_response()
    }
}

impl IntoResponse for CountryNotAllowed {
    fn into_response(self) -> Response {
        (status_code(self.code), Json(self.to_payload())).into_response()
    }
}

/// Middleware terminating requests from countries outside the allow-list.
///
/// Install with `axum::middleware::from_fn_with_state(guard, geo_guard_middleware)`.
pub async fn geo_guard_middleware(
    State(guard): State<GeoGuard>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let info = request_info(request.headers(), peer);

    let decision = guard.decide(Target::Request(&info)).await;
    if decision.allowed {
        return next.run(request).await;
    }

    tracing::info!(
        "denied {} {} (country {:?}, {})",
        request.method(),
        request.uri().path(),
        decision.resolved_country,
        decision.reason
    );
    deny_response(&guard, guard.denial(&decision))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::application::test_support::StubProvider;
    use crate::application::{CountryResolver, ProviderRegistry, ResolverSettings, ResponseSettings};
    use crate::domain::entities::AccessPolicy;
    use crate::domain::ports::GeoProvider;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn guard(provider: Arc<StubProvider>) -> GeoGuard {
        let mut settings = ResolverSettings::default();
        settings.providers.primary = "ip-api".to_string();
        settings.providers.fallbacks = Vec::new();
        let registry: ProviderRegistry =
            std::iter::once(provider as Arc<dyn GeoProvider>).collect();
        let resolver = CountryResolver::new(registry, None, settings);
        GeoGuard::new(Arc::new(resolver), AccessPolicy::default())
    }

    fn app(guard: GeoGuard) -> Router {
        Router::new()
            .route("/", get(|| async { "welcome" }))
            .route_layer(middleware::from_fn_with_state(
                guard,
                geo_guard_middleware,
            ))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // ===== RequestInfo Tests =====

    #[test]
    fn test_request_info_keeps_only_known_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "5.160.0.1, 10.0.0.1".parse().unwrap());
        headers.insert("cf-ipcountry", "IR".parse().unwrap());
        headers.insert("user-agent", "curl".parse().unwrap());

        let info = request_info(&headers, Some("10.0.0.2:5555".parse().unwrap()));
        assert_eq!(info.header("x-forwarded-for"), Some("5.160.0.1, 10.0.0.1"));
        assert_eq!(info.header("cf-ipcountry"), Some("IR"));
        assert_eq!(info.header("user-agent"), None);
        assert_eq!(info.peer_addr, Some("10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn test_status_code_fallback() {
        assert_eq!(status_code(451), StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS);
        assert_eq!(status_code(42), StatusCode::FORBIDDEN);
    }

    // ===== Middleware Tests =====

    #[tokio::test]
    async fn test_allowed_request_passes_through() {
        let provider = Arc::new(StubProvider::country("ip-api", "IR"));
        let response = app(guard(provider))
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-forwarded-for", "5.160.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "welcome");
    }

    #[tokio::test]
    async fn test_denied_request_gets_json_body() {
        let provider = Arc::new(StubProvider::country("ip-api", "IR"));
        let response = app(guard(provider.clone()))
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("cf-ipcountry", "US")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": true,
                "message": "Access from your country is not allowed.",
                "country": "US",
                "allowed_countries": ["IR"]
            })
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_denied_request_plain_text() {
        let provider = Arc::new(StubProvider::country("ip-api", "US"));
        let guard = guard(provider).with_response(ResponseSettings {
            status_code: 451,
            json_response: false,
        });

        let response = app(guard)
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-real-ip", "8.8.8.8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS);
        assert_eq!(
            body_string(response).await,
            "Access from your country is not allowed."
        );
    }

    #[tokio::test]
    async fn test_request_without_client_ip_is_local() {
        let provider = Arc::new(StubProvider::country("ip-api", "US"));
        let response = app(guard(provider.clone()))
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_info_used_as_peer() {
        let provider = Arc::new(StubProvider::country("ip-api", "US"));
        let mut request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("8.8.8.8:40000".parse().unwrap()));

        let response = app(guard(provider.clone())).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_country_not_allowed_into_response() {
        let denial = CountryNotAllowed {
            message: "blocked".to_string(),
            detected_country: Some("US".to_string()),
            allowed_countries: vec!["IR".to_string()],
            code: 403,
        };

        let response = denial.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["detected_country"], "US");
        assert_eq!(json["code"], 403);
    }
}
