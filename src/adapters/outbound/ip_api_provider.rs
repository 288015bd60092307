//! ip-api.com Provider
//!
//! Free lookup service, no credentials. Reports failures in-band with
//! `"status": "fail"` and a 200 response.

use super::http_json::{get_json, non_empty};
use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::{CountryCode, LocationSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;

pub const IP_API: &str = "ip-api";

const DEFAULT_BASE_URL: &str = "http://ip-api.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country_code: Option<String>,
    country: Option<String>,
    city: Option<String>,
    region_name: Option<String>,
}

/// ip-api.com client.
pub struct IpApiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, ip: IpAddr) -> String {
        format!("{}/json/{}", self.base_url, ip)
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    fn name(&self) -> &str {
        IP_API
    }

    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError> {
        let data: IpApiResponse = get_json(&self.client, IP_API, &self.url(ip), &[]).await?;

        if data.status.as_deref() == Some("fail") {
            return Err(ProviderError::Rejected {
                provider: IP_API.to_string(),
                message: data
                    .message
                    .unwrap_or_else(|| format!("no location for {}", ip)),
            });
        }

        Ok(LocationRecord {
            ip,
            country_code: data.country_code.as_deref().and_then(CountryCode::parse),
            country_name: non_empty(data.country),
            city: non_empty(data.city),
            region: non_empty(data.region_name),
            is_local: false,
            source: LocationSource::Provider(IP_API.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/5.160.0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "country": "Iran",
                "countryCode": "IR",
                "regionName": "Tehran",
                "city": "Tehran",
                "query": "5.160.0.1"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::with_base_url(reqwest::Client::new(), mock_server.uri());
        let record = provider.lookup(ip("5.160.0.1")).await.unwrap();

        assert_eq!(record.ip, ip("5.160.0.1"));
        assert_eq!(record.country_code.unwrap().as_str(), "IR");
        assert_eq!(record.country_name.as_deref(), Some("Iran"));
        assert_eq!(record.city.as_deref(), Some("Tehran"));
        assert_eq!(record.region.as_deref(), Some("Tehran"));
        assert!(!record.is_local);
        assert_eq!(record.source, LocationSource::Provider("ip-api".to_string()));
    }

    #[tokio::test]
    async fn test_fail_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "quota exceeded",
                "query": "8.8.8.8"
            })))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::with_base_url(reqwest::Client::new(), mock_server.uri());
        let err = provider.lookup(ip("8.8.8.8")).await.unwrap_err();

        assert_eq!(
            err,
            ProviderError::Rejected {
                provider: "ip-api".to_string(),
                message: "quota exceeded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_fields_stay_absent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/1.1.1.1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "success"})),
            )
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::with_base_url(reqwest::Client::new(), mock_server.uri());
        let record = provider.lookup(ip("1.1.1.1")).await.unwrap();

        assert!(record.country_code.is_none());
        assert!(record.country_name.is_none());
        assert!(record.city.is_none());
        assert!(record.region.is_none());
    }

    #[tokio::test]
    async fn test_lowercase_country_is_normalized() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "countryCode": "ir"
            })))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::with_base_url(reqwest::Client::new(), mock_server.uri());
        let record = provider.lookup(ip("5.160.0.1")).await.unwrap();
        assert_eq!(record.country_code.unwrap().as_str(), "IR");
    }

    #[tokio::test]
    async fn test_ipv6_path() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/2001:4860:4860::8888"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "countryCode": "US"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::with_base_url(reqwest::Client::new(), mock_server.uri());
        let record = provider.lookup(ip("2001:4860:4860::8888")).await.unwrap();
        assert_eq!(record.country_code.unwrap().as_str(), "US");
    }

    #[test]
    fn test_default_url() {
        let provider = IpApiProvider::new(reqwest::Client::new());
        assert_eq!(provider.url(ip("8.8.8.8")), "http://ip-api.com/json/8.8.8.8");
        assert_eq!(provider.name(), "ip-api");
    }
}
