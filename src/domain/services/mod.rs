//! Domain services: pure logic with no I/O.

pub mod access_evaluator;
pub mod cdn_headers;
pub mod ip_extractor;
pub mod local_ranges;
pub mod provider_chain;

pub use access_evaluator::evaluate;
pub use cdn_headers::{country_from_headers, CDN_COUNTRY_HEADERS};
pub use ip_extractor::{client_ip, TRUST_HEADERS};
pub use local_ranges::is_local;
pub use provider_chain::attempt_order;
