//! Shared HTTP plumbing for the provider adapters.

use crate::domain::errors::ProviderError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build the client shared by every provider, bounded by the configured timeouts.
pub fn build_http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(concat!("geo-gate/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Issue one GET and decode the JSON body.
///
/// Query pairs are form-encoded by reqwest, so credentials may carry any
/// character.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ProviderError::Transport {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: response.status().as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

    serde_json::from_slice(&body).map_err(|e| ProviderError::Decode {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Treat empty strings from a provider as missing.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
