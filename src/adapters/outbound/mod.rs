mod dashmap_country_cache;
mod http_json;
mod ip_api_ir_provider;
mod ip_api_provider;
mod ipdata_provider;
mod ipinfo_provider;

pub use dashmap_country_cache::DashMapCountryCache;
pub use http_json::build_http_client;
pub use ip_api_ir_provider::{IpApiIrProvider, IP_API_IR};
pub use ip_api_provider::{IpApiProvider, IP_API};
pub use ipdata_provider::{IpDataProvider, IPDATA};
pub use ipinfo_provider::{IpInfoProvider, IPINFO};

use crate::domain::entities::ProviderCredentials;
use crate::domain::ports::GeoProvider;
use std::sync::Arc;

/// Every built-in provider, sharing one HTTP client.
pub fn builtin_providers(
    client: reqwest::Client,
    credentials: &ProviderCredentials,
) -> Vec<Arc<dyn GeoProvider>> {
    vec![
        Arc::new(IpApiProvider::new(client.clone())),
        Arc::new(IpInfoProvider::new(
            client.clone(),
            credentials.ipinfo_token.clone(),
        )),
        Arc::new(IpDataProvider::new(
            client.clone(),
            credentials.ipdata_api_key.clone(),
        )),
        Arc::new(IpApiIrProvider::new(client, credentials.ip_api_ir_guid.clone())),
    ]
}
