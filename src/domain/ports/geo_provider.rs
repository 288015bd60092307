//! Geolocation Provider Port
//!
//! Defines the interface for a single remote IP-to-location lookup.

use crate::domain::entities::LocationRecord;
use crate::domain::errors::ProviderError;
use async_trait::async_trait;
use std::net::IpAddr;

/// One remote geolocation service.
///
/// This is an outbound port. Each implementation issues one request per call and
/// maps the service's own field names onto [`LocationRecord`]. Fields the service
/// does not return stay `None`.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Identifier used in configuration (`ip-api`, `ipinfo`, ...).
    fn name(&self) -> &str;

    /// Look up a single address.
    ///
    /// Fails on transport errors, non-2xx responses, unparseable bodies and
    /// failures reported by the service itself.
    async fn lookup(&self, ip: IpAddr) -> Result<LocationRecord, ProviderError>;
}
