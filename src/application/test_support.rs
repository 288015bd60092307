//! In-memory provider double shared by the application and adapter tests.

use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use crate::domain::ports::GeoProvider;
use crate::domain::value_objects::{CountryCode, LocationSource};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider that fails a fixed number of times, then answers with a fixed country.
pub struct StubProvider {
    name: String,
    country: Option<String>,
    failures_before_success: usize,
    calls: AtomicUsize,
}

impl StubProvider {
    /// Always answers with `country`.
    pub fn country(name: &str, country: &str) -> Self {
        Self::flaky(name, 0, Some(country))
    }

    /// Always answers, without a country.
    pub fn no_country(name: &str) -> Self {
        Self::flaky(name, 0, None)
    }

    /// Never answers.
    pub fn failing(name: &str) -> Self {
        Self::flaky(name, usize::MAX, None)
    }

    pub fn flaky(name: &str, failures_before_success: usize, country: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            country: country.map(str::to_string),
            failures_before_success,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoProvider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(ProviderError::Transport {
                provider: self.name.clone(),
                message: format!("connection reset (call {})", call + 1),
            });
        }

        Ok(LocationRecord {
            ip,
            country_code: self.country.as_deref().and_then(CountryCode::parse),
            country_name: None,
            city: Some("Testville".to_string()),
            region: None,
            is_local: false,
            source: LocationSource::Provider(self.name.clone()),
        })
    }
}
