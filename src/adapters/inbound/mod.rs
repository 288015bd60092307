mod api_server;
pub mod http_guard;

pub use api_server::{ApiServer, ApiState, CountryResponse, DebugResponse, HealthResponse};
pub use http_guard::{deny_response, geo_guard_middleware, request_info, DenyBody};
