//! Geo API Server
//!
//! HTTP surface of the guard: lookup endpoints for operators and a protected
//! root route that shows the middleware in action.

use super::http_guard::{geo_guard_middleware, request_info};
use crate::application::GeoGuard;
use crate::domain::entities::{RequestInfo, ResolutionSource, Target};
use crate::domain::services::{client_ip, CDN_COUNTRY_HEADERS, TRUST_HEADERS};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Optional explicit address for the lookup endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub ip: Option<String>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<String>,
}

/// Country lookup response.
#[derive(Debug, Serialize)]
pub struct CountryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
    pub country: Option<String>,
    pub source: ResolutionSource,
}

/// Everything the guard sees about the calling client.
#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub client_ip: IpAddr,
    pub detected_country: Option<String>,
    pub reason: String,
    pub is_allowed: bool,
    pub allowed_countries: Vec<String>,
    pub allow_local: bool,
    pub fallback_allow: bool,
    pub headers: BTreeMap<String, String>,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub guard: GeoGuard,
}

impl ApiState {
    pub fn new(guard: GeoGuard) -> Self {
        Self { guard }
    }
}

/// HTTP server exposing the guard.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, guard: GeoGuard) -> Self {
        Self {
            listen_addr,
            state: ApiState::new(guard),
        }
    }

    /// Build the router. `/` is protected by the geo guard, the API routes are not.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/", get(index_handler))
            .route_layer(middleware::from_fn_with_state(
                self.state.guard.clone(),
                geo_guard_middleware,
            ));

        Router::new()
            // Health endpoint
            .route("/health", get(health_handler))
            // Lookups
            .route("/api/v1/country", get(country_handler))
            .route("/api/v1/location", get(location_handler))
            .route("/api/v1/check", get(check_handler))
            .route("/api/v1/debug", get(debug_handler))
            .with_state(self.state.clone())
            .merge(protected)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server.
    ///
    /// The final Ok(()) is excluded from coverage since axum::serve runs forever.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("geo API listening on {}", self.listen_addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

fn peer(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<SocketAddr> {
    connect_info.map(|ConnectInfo(addr)| addr)
}

/// Parse the `ip` query parameter, rejecting malformed addresses.
#[allow(clippy::result_large_err)]
fn explicit_ip(query: &LookupQuery) -> Result<Option<IpAddr>, Response> {
    match query.ip.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "invalid ip address",
                    "ip": raw
                })),
            )
                .into_response()
        }),
    }
}

fn target<'a>(ip: Option<IpAddr>, info: &'a RequestInfo) -> Target<'a> {
    match ip {
        Some(ip) => Target::Ip(ip),
        None => Target::Request(info),
    }
}

fn lookup_failed(state: &ApiState) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({
            "error": true,
            "message": state.guard.messages().api_error
        })),
    )
        .into_response()
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state.guard.resolver().provider_order(),
    };
    Json(response)
}

async fn index_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "Access granted."
    }))
}

async fn country_handler(
    State(state): State<ApiState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Response {
    let ip = match explicit_ip(&query) {
        Ok(ip) => ip,
        Err(response) => return response,
    };
    let info = request_info(&headers, peer(connect_info));

    match state.guard.resolve_country(target(ip, &info)).await {
        Ok(resolution) => Json(CountryResponse {
            ip,
            country: resolution.country,
            source: resolution.source,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!("country lookup failed: {}", e);
            lookup_failed(&state)
        }
    }
}

async fn location_handler(
    State(state): State<ApiState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Response {
    let ip = match explicit_ip(&query) {
        Ok(ip) => ip,
        Err(response) => return response,
    };
    let info = request_info(&headers, peer(connect_info));

    match state.guard.location_details(target(ip, &info)).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => {
            tracing::warn!("location lookup failed: {}", e);
            lookup_failed(&state)
        }
    }
}

async fn check_handler(
    State(state): State<ApiState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Response {
    let ip = match explicit_ip(&query) {
        Ok(ip) => ip,
        Err(response) => return response,
    };
    let info = request_info(&headers, peer(connect_info));

    Json(state.guard.decide(target(ip, &info)).await).into_response()
}

async fn debug_handler(
    State(state): State<ApiState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let info = request_info(&headers, peer(connect_info));
    let decision = state.guard.decide(Target::Request(&info)).await;
    let policy = state.guard.policy();

    let seen: BTreeMap<String, String> = TRUST_HEADERS
        .iter()
        .chain(CDN_COUNTRY_HEADERS.iter())
        .filter_map(|name| info.header(name).map(|v| (name.to_string(), v.to_string())))
        .collect();

    Json(DebugResponse {
        client_ip: client_ip(&info),
        detected_country: decision.resolved_country,
        reason: decision.reason.to_string(),
        is_allowed: decision.allowed,
        allowed_countries: policy.allowed_countries().to_vec(),
        allow_local: policy.allow_local,
        fallback_allow: policy.fallback_allow,
        headers: seen,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::DashMapCountryCache;
    use crate::application::test_support::StubProvider;
    use crate::application::{CountryResolver, ProviderRegistry, ResolverSettings};
    use crate::domain::entities::AccessPolicy;
    use crate::domain::ports::{CountryCache, GeoProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode as HttpStatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_server(provider: Arc<StubProvider>, fallback_allow: bool) -> ApiServer {
        let mut settings = ResolverSettings::default();
        settings.providers.primary = provider.name().to_string();
        settings.providers.fallbacks = Vec::new();
        settings.fallback_allow = fallback_allow;

        let registry: ProviderRegistry =
            std::iter::once(provider as Arc<dyn GeoProvider>).collect();
        let cache: Arc<dyn CountryCache> = Arc::new(DashMapCountryCache::new());
        let resolver = CountryResolver::new(registry, Some(cache), settings);
        let guard = GeoGuard::new(Arc::new(resolver), AccessPolicy::new(["IR", "TR"]));

        ApiServer::new("127.0.0.1:0".to_string(), guard)
    }

    async fn get_json(app: Router, uri: &str, headers: &[(&str, &str)]) -> (HttpStatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // ===== Health Tests =====

    #[tokio::test]
    async fn test_health_handler() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/health", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["providers"], serde_json::json!(["ip-api"]));
    }

    // ===== Country Tests =====

    #[tokio::test]
    async fn test_country_for_explicit_ip() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/api/v1/country?ip=5.160.0.1", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({"ip": "5.160.0.1", "country": "IR", "source": "provider:ip-api"})
        );
    }

    #[tokio::test]
    async fn test_country_for_caller_uses_cdn_header() {
        let provider = Arc::new(StubProvider::country("ip-api", "IR"));
        let server = create_test_server(provider.clone(), true);
        let (status, json) =
            get_json(server.router(), "/api/v1/country", &[("cf-ipcountry", "tr")]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json, serde_json::json!({"country": "TR", "source": "cdn"}));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_country_rejects_malformed_ip() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/api/v1/country?ip=not-an-ip", &[]).await;

        assert_eq!(status, HttpStatusCode::BAD_REQUEST);
        assert_eq!(json["ip"], "not-an-ip");
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_exhausted_strict_is_service_unavailable() {
        let server = create_test_server(Arc::new(StubProvider::failing("ip-api")), false);
        let (status, json) = get_json(server.router(), "/api/v1/country?ip=8.8.8.8", &[]).await;

        assert_eq!(status, HttpStatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["message"], "Unable to determine your location.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_exhausted_permissive_is_null() {
        let server = create_test_server(Arc::new(StubProvider::failing("ip-api")), true);
        let (status, json) = get_json(server.router(), "/api/v1/country?ip=8.8.8.8", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert!(json["country"].is_null());
        assert_eq!(json["source"], "exhausted");
    }

    // ===== Location Tests =====

    #[tokio::test]
    async fn test_location_for_local_ip() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/api/v1/location?ip=192.168.1.7", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json["country_name"], "Local Network");
        assert_eq!(json["is_local"], true);
        assert!(json["country_code"].is_null());
    }

    #[tokio::test]
    async fn test_location_from_provider() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/api/v1/location?ip=5.160.0.1", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json["country_code"], "IR");
        assert_eq!(json["city"], "Testville");
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_exhausted_is_service_unavailable() {
        let server = create_test_server(Arc::new(StubProvider::failing("ip-api")), true);
        let (status, _) = get_json(server.router(), "/api/v1/location?ip=8.8.8.8", &[]).await;
        assert_eq!(status, HttpStatusCode::SERVICE_UNAVAILABLE);
    }

    // ===== Check Tests =====

    #[tokio::test]
    async fn test_check_denied() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "US")), true);
        let (status, json) = get_json(server.router(), "/api/v1/check?ip=8.8.8.8", &[]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "allowed": false,
                "resolved_country": "US",
                "reason": "provider-success"
            })
        );
    }

    #[tokio::test]
    async fn test_check_local_caller() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "US")), true);
        let (_, json) = get_json(server.router(), "/api/v1/check", &[]).await;

        assert_eq!(json["allowed"], true);
        assert_eq!(json["reason"], "local");
    }

    // ===== Debug Tests =====

    #[tokio::test]
    async fn test_debug_reports_headers_and_decision() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "TR")), true);
        let (status, json) = get_json(
            server.router(),
            "/api/v1/debug",
            &[("x-forwarded-for", "5.160.0.1, 10.0.0.1"), ("user-agent", "curl")],
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json["client_ip"], "5.160.0.1");
        assert_eq!(json["detected_country"], "TR");
        assert_eq!(json["is_allowed"], true);
        assert_eq!(json["allowed_countries"], serde_json::json!(["IR", "TR"]));
        assert_eq!(
            json["headers"],
            serde_json::json!({"x-forwarded-for": "5.160.0.1, 10.0.0.1"})
        );
    }

    // ===== Protected Route Tests =====

    #[tokio::test]
    async fn test_index_allowed() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "IR")), true);
        let (status, json) = get_json(server.router(), "/", &[("x-real-ip", "5.160.0.1")]).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_index_denied() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "US")), true);
        let (status, json) = get_json(server.router(), "/", &[("x-real-ip", "8.8.8.8")]).await;

        assert_eq!(status, HttpStatusCode::FORBIDDEN);
        assert_eq!(json["success"], false);
        assert_eq!(json["country"], "US");
    }

    #[tokio::test]
    async fn test_api_routes_are_not_guarded() {
        let server = create_test_server(Arc::new(StubProvider::country("ip-api", "US")), true);
        let (status, _) = get_json(server.router(), "/health", &[("x-real-ip", "8.8.8.8")]).await;
        assert_eq!(status, HttpStatusCode::OK);
    }
}
