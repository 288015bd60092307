//! ip-api.ir Provider
//!
//! Lookup service hosted inside Iran, reachable from servers whose outbound
//! traffic to foreign services is filtered. Without a GUID only an explicit
//! field list is requested; with one the full profile endpoint is used.

use super::http_json::{get_json, non_empty};
use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::{CountryCode, LocationSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;

pub const IP_API_IR: &str = "ip-api-ir";

const DEFAULT_BASE_URL: &str = "https://ip-api.ir";

/// Fields requested on the anonymous endpoint.
const FIELDS: &str = "status,message,country,countryCode,city,regionName";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiIrResponse {
    status: Option<String>,
    message: Option<String>,
    country_code: Option<String>,
    country: Option<String>,
    country_name: Option<String>,
    city: Option<String>,
    region_name: Option<String>,
    region: Option<String>,
}

/// ip-api.ir client.
pub struct IpApiIrProvider {
    client: reqwest::Client,
    base_url: String,
    guid: Option<String>,
}

impl IpApiIrProvider {
    pub fn new(client: reqwest::Client, guid: Option<String>) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, guid)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        guid: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            guid: guid.filter(|g| !g.is_empty()),
        }
    }

    fn url(&self, ip: IpAddr) -> String {
        match &self.guid {
            Some(guid) => format!("{}/info/{}/{}", self.base_url, guid, ip),
            None => format!("{}/info/{}/{}", self.base_url, ip, FIELDS),
        }
    }
}

#[async_trait]
impl GeoProvider for IpApiIrProvider {
    fn name(&self) -> &str {
        IP_API_IR
    }

    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError> {
        let data: IpApiIrResponse = get_json(&self.client, IP_API_IR, &self.url(ip), &[]).await?;

        if data.status.as_deref() == Some("fail") {
            return Err(ProviderError::Rejected {
                provider: IP_API_IR.to_string(),
                message: data
                    .message
                    .unwrap_or_else(|| format!("no location for {}", ip)),
            });
        }

        Ok(LocationRecord {
            ip,
            country_code: data.country_code.as_deref().and_then(CountryCode::parse),
            country_name: non_empty(data.country).or(non_empty(data.country_name)),
            city: non_empty(data.city),
            region: non_empty(data.region_name).or(non_empty(data.region)),
            is_local: false,
            source: LocationSource::Provider(IP_API_IR.to_string()),
        })
    }
}
