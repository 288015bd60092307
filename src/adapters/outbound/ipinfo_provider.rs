//! ipinfo.io Provider
//!
//! Token is optional (free tier is rate limited without one). The response
//! carries no country name.

use super::http_json::{get_json, non_empty};
use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::{CountryCode, LocationSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;

pub const IPINFO: &str = "ipinfo";

const DEFAULT_BASE_URL: &str = "https://ipinfo.io";

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    country: Option<String>,
    city: Option<String>,
    region: Option<String>,
}

/// ipinfo.io client.
pub struct IpInfoProvider {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IpInfoProvider {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn url(&self, ip: IpAddr) -> String {
        format!("{}/{}/json", self.base_url, ip)
    }

    fn query(&self) -> Vec<(&str, &str)> {
        self.token
            .as_deref()
            .map(|token| vec![("token", token)])
            .unwrap_or_default()
    }
}

#[async_trait]
impl GeoProvider for IpInfoProvider {
    fn name(&self) -> &str {
        IPINFO
    }

    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError> {
        let data: IpInfoResponse =
            get_json(&self.client, IPINFO, &self.url(ip), &self.query()).await?;

        Ok(LocationRecord {
            ip,
            country_code: data.country.as_deref().and_then(CountryCode::parse),
            country_name: None,
            city: non_empty(data.city),
            region: non_empty(data.region),
            is_local: false,
            source: LocationSource::Provider(IPINFO.to_string()),
        })
    }
}
