//! Adapters: axum inbound surface and HTTP/DashMap outbound implementations.

pub mod inbound;
pub mod outbound;
