//! geo-gate - Country access control service
//!
//! This is the composition root that wires together all the components.

use geo_gate::adapters::inbound::ApiServer;
use geo_gate::adapters::outbound::{build_http_client, builtin_providers, DashMapCountryCache};
use geo_gate::config::load_config;
use geo_gate::domain::ports::CountryCache;
use geo_gate::{CountryResolver, GeoGuard, ProviderRegistry};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting geo-gate listen={} allowed={:?}",
        cfg.listen_addr,
        cfg.allowed_countries
    );

    // ===== COMPOSITION ROOT =====

    // 1. Create outbound adapters

    // Providers share one HTTP client bounded by the configured timeouts
    let providers = cfg.provider_config();
    let client = build_http_client(providers.timeout, providers.connect_timeout)?;
    let registry: ProviderRegistry = builtin_providers(client, &providers.credentials)
        .into_iter()
        .collect();

    for name in std::iter::once(&providers.primary).chain(providers.fallbacks.iter()) {
        if !registry.contains(name) {
            tracing::warn!("unknown provider {} in configuration, it will be skipped", name);
        }
    }

    // Country cache (DashMap)
    let cache: Option<Arc<dyn CountryCache>> = if cfg.cache_enabled {
        Some(Arc::new(DashMapCountryCache::new()))
    } else {
        tracing::info!("country cache disabled");
        None
    };

    // 2. Create application services
    let resolver = Arc::new(CountryResolver::new(registry, cache, cfg.resolver_settings()));
    tracing::info!("provider order: {:?}", resolver.provider_order());

    let guard = GeoGuard::new(resolver, cfg.access_policy())
        .with_messages(cfg.messages())
        .with_response(cfg.response_settings());

    // 3. Create inbound adapter and run
    let server = ApiServer::new(cfg.listen_addr.clone(), guard);

    server.run().await
}
