//! ipdata.co Provider
//!
//! Requires an API key on every request.

use super::http_json::{get_json, non_empty};
use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::{CountryCode, LocationSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;

pub const IPDATA: &str = "ipdata";

const DEFAULT_BASE_URL: &str = "https://api.ipdata.co";

#[derive(Debug, Deserialize)]
struct IpDataResponse {
    country_code: Option<String>,
    country_name: Option<String>,
    city: Option<String>,
    region: Option<String>,
}

/// ipdata.co client.
pub struct IpDataProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl IpDataProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn url(&self, ip: IpAddr) -> String {
        format!("{}/{}", self.base_url, ip)
    }
}

#[async_trait]
impl GeoProvider for IpDataProvider {
    fn name(&self) -> &str {
        IPDATA
    }

    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredential {
                provider: IPDATA.to_string(),
                credential: "api key",
            })?;

        let data: IpDataResponse = get_json(
            &self.client,
            IPDATA,
            &self.url(ip),
            &[("api-key", api_key)],
        )
        .await?;

        Ok(LocationRecord {
            ip,
            country_code: data.country_code.as_deref().and_then(CountryCode::parse),
            country_name: non_empty(data.country_name),
            city: non_empty(data.city),
            region: non_empty(data.region),
            is_local: false,
            source: LocationSource::Provider(IPDATA.to_string()),
        })
    }
}
