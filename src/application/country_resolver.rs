//! Country Resolver - Main application use case
//!
//! Orchestrates country resolution: CDN headers, local addresses, the result
//! cache and finally the provider chain with per-provider retries.

use crate::application::ProviderRegistry;
use crate::domain::entities::{
    LocationRecord, ProviderConfig, Resolution, ResolutionSource, Target,
};
use crate::domain::errors::{ProviderError, ResolveError};
use crate::domain::ports::CountryCache;
use crate::domain::services::{attempt_order, client_ip, country_from_headers, is_local};
use crate::domain::value_objects::{CountryCode, DEFAULT_LOCAL_COUNTRY, UNKNOWN_COUNTRY};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Fixed pause between two attempts against the same provider.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Resolver behaviour that is not part of the provider chain itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub providers: ProviderConfig,
    pub cache_ttl: Duration,
    /// Returned for loopback, private and reserved addresses
    pub local_country: String,
    /// Degrade to "no country" instead of failing when every provider fails
    pub fallback_allow: bool,
    pub retry_backoff: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            providers: ProviderConfig::default(),
            cache_ttl: Duration::from_secs(3600),
            local_country: DEFAULT_LOCAL_COUNTRY.to_string(),
            fallback_allow: true,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

/// Country resolver.
///
/// Attempts run strictly one after another, so a full exhaustion takes up to
/// `providers x retry_count x (timeout + backoff)`. Callers needing a tighter
/// bound wrap the call in their own deadline; dropping the future aborts the
/// in-flight request.
pub struct CountryResolver {
    registry: ProviderRegistry,
    cache: Option<Arc<dyn CountryCache>>,
    settings: ResolverSettings,
}

impl CountryResolver {
    /// Create a resolver. Pass `None` as cache to disable caching.
    pub fn new(
        registry: ProviderRegistry,
        cache: Option<Arc<dyn CountryCache>>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&Arc<dyn CountryCache>> {
        self.cache.as_ref()
    }

    /// Providers in the order they are attempted.
    pub fn provider_order(&self) -> Vec<String> {
        attempt_order(
            &self.settings.providers.primary,
            &self.settings.providers.fallbacks,
        )
    }

    /// Resolve the country for a target.
    ///
    /// Returns `Ok` with `country: None` when every provider failed and
    /// `fallback_allow` is set; fails with [`ResolveError::Exhausted`] otherwise.
    pub async fn resolve(&self, target: Target<'_>) -> Result<Resolution, ResolveError> {
        let ip = match target {
            Target::Request(request) => {
                // CDN headers only describe the current connection
                if let Some(code) = country_from_headers(request) {
                    return Ok(Resolution::new(code.into_string(), ResolutionSource::Cdn));
                }
                client_ip(request)
            }
            Target::Ip(ip) => ip,
        };

        if is_local(ip) {
            tracing::debug!("{} is local, returning {}", ip, self.settings.local_country);
            return Ok(Resolution::new(
                self.settings.local_country.clone(),
                ResolutionSource::Local,
            ));
        }

        if let Some(entry) = self.cache.as_ref().and_then(|cache| cache.get(&ip)) {
            tracing::debug!("cache hit for {}: {:?}", ip, entry.country_code);
            let country = entry
                .country_code
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
            return Ok(Resolution::new(country, ResolutionSource::Cache));
        }

        match self.query_chain(ip).await {
            Ok((provider, record)) => {
                let country = record
                    .country_code
                    .map(CountryCode::into_string)
                    .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());

                if let Some(cache) = &self.cache {
                    cache.put(ip, Some(country.clone()), self.settings.cache_ttl);
                }

                tracing::debug!("resolved {} -> {} via {}", ip, country, provider);
                Ok(Resolution::new(country, ResolutionSource::Provider(provider)))
            }
            Err(err) if self.settings.fallback_allow => {
                tracing::warn!("{}; country of {} left undetermined", err, ip);
                Ok(Resolution::exhausted())
            }
            Err(err) => {
                tracing::warn!("{}; failing lookup of {}", err, ip);
                Err(err)
            }
        }
    }

    /// Full location record for a target.
    ///
    /// Walks the same chain as [`resolve`](Self::resolve) but bypasses the cache,
    /// which only holds country codes. Exhaustion is always an error here.
    pub async fn location_details(&self, target: Target<'_>) -> Result<LocationRecord, ResolveError> {
        let ip = match target {
            Target::Request(request) => {
                let ip = client_ip(request);
                if let Some(code) = country_from_headers(request) {
                    return Ok(LocationRecord::from_cdn(ip, code));
                }
                ip
            }
            Target::Ip(ip) => ip,
        };

        if is_local(ip) {
            return Ok(LocationRecord::local(ip));
        }

        self.query_chain(ip).await.map(|(_, record)| record)
    }

    /// Try every provider in order until one answers.
    async fn query_chain(&self, ip: IpAddr) -> Result<(String, LocationRecord), ResolveError> {
        let per_provider = self.settings.providers.retry_count.max(1);
        let mut attempts = 0;
        let mut last: Option<ProviderError> = None;

        for name in self.provider_order() {
            let Some(provider) = self.registry.get(&name) else {
                tracing::warn!("provider {} is not registered, skipping", name);
                continue;
            };

            for attempt in 1..=per_provider {
                attempts += 1;
                match provider.lookup(ip).await {
                    Ok(record) => return Ok((name, record)),
                    Err(e) => {
                        tracing::warn!(
                            "lookup of {} via {} failed (attempt {}/{}): {}",
                            ip,
                            name,
                            attempt,
                            per_provider,
                            e
                        );
                        last = Some(e);
                    }
                }

                if attempt < per_provider {
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
            }
        }

        Err(ResolveError::Exhausted { attempts, last })
    }
}
