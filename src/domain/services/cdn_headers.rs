//! CDN Country Headers
//!
//! Reverse proxies and CDNs inject the geolocated country of the connecting
//! client. Reading it costs nothing, so it is tried before any lookup.

use crate::domain::entities::RequestInfo;
use crate::domain::value_objects::CountryCode;

/// Country headers in priority order.
pub const CDN_COUNTRY_HEADERS: [&str; 6] = [
    "cf-ipcountry",              // Cloudflare
    "cloudfront-viewer-country", // AWS CloudFront
    "x-vercel-ip-country",       // Vercel
    "x-country-code",
    "geoip-country-code", // nginx/apache GeoIP module
    "x-geo-country",
];

/// First acceptable country code among the CDN headers.
///
/// Values are trimmed and uppercased; anything that is not two letters, and the
/// `XX`/`T1` sentinels, is ignored so the next header gets a chance.
pub fn country_from_headers(request: &RequestInfo) -> Option<CountryCode> {
    CDN_COUNTRY_HEADERS.iter().find_map(|name| {
        let code = CountryCode::parse(request.header(name)?)?;
        tracing::debug!("country {} taken from {} header", code, name);
        Some(code)
    })
}
