//! Application layer: use cases composed from domain ports.

pub mod country_resolver;
pub mod geo_guard;
pub mod provider_registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use country_resolver::{CountryResolver, ResolverSettings, RETRY_BACKOFF};
pub use geo_guard::{GeoGuard, Messages, ResponseSettings};
pub use provider_registry::ProviderRegistry;
