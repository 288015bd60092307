//! Client IP Extraction
//!
//! Picks the client address from proxy trust headers, falling back to the
//! socket peer and finally to loopback.

use crate::domain::entities::RequestInfo;
use std::net::{IpAddr, Ipv4Addr};

/// Trust headers in priority order. Only the first comma-separated token of each is used.
pub const TRUST_HEADERS: [&str; 4] = [
    "cf-connecting-ip", // Cloudflare
    "x-forwarded-for",  // generic proxy chain, client first
    "x-real-ip",        // nginx
    "client-ip",
];

/// Address used when nothing in the request validates.
pub const DEFAULT_CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Determine the client IP of a request.
///
/// Headers are never authenticated; deploy behind a proxy that overwrites them.
pub fn client_ip(request: &RequestInfo) -> IpAddr {
    TRUST_HEADERS
        .iter()
        .filter_map(|name| request.header(name))
        .find_map(first_valid_ip)
        .or(request.peer_addr)
        .unwrap_or(DEFAULT_CLIENT_IP)
}

fn first_valid_ip(value: &str) -> Option<IpAddr> {
    value.split(',').next()?.trim().parse().ok()
}
