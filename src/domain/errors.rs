//! Domain Errors
//!
//! Provider failures stay inside the resolver, resolution failures escape only
//! under strict-deny configuration, and policy denials always reach the boundary.

use serde::Serialize;

/// Failure of a single provider attempt. Always retried or skipped, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider}: request failed: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider}: unexpected status {status}")]
    Status { provider: String, status: u16 },
    #[error("{provider}: malformed response: {message}")]
    Decode { provider: String, message: String },
    #[error("{provider}: lookup rejected: {message}")]
    Rejected { provider: String, message: String },
    #[error("{provider}: missing {credential}")]
    MissingCredential {
        provider: String,
        credential: &'static str,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::MissingCredential { provider, .. } => provider,
        }
    }
}

/// Every provider and retry failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("all geolocation providers failed after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Option<ProviderError>,
    },
}

/// Access denied by the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CountryNotAllowed {
    pub message: String,
    pub detected_country: Option<String>,
    pub allowed_countries: Vec<String>,
    pub code: u16,
}

/// Structured body of a [`CountryNotAllowed`] denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryNotAllowedPayload {
    pub error: bool,
    pub message: String,
    pub detected_country: Option<String>,
    pub allowed_countries: Vec<String>,
    pub code: u16,
}

impl CountryNotAllowed {
    pub fn to_payload(&self) -> CountryNotAllowedPayload {
        CountryNotAllowedPayload {
            error: true,
            message: self.message.clone(),
            detected_country: self.detected_country.clone(),
            allowed_countries: self.allowed_countries.clone(),
            code: self.code,
        }
    }
}
