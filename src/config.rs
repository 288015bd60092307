use crate::application::{Messages, ResolverSettings, ResponseSettings, RETRY_BACKOFF};
use crate::domain::entities::{AccessPolicy, ProviderConfig, ProviderCredentials};
use crate::domain::value_objects::DEFAULT_LOCAL_COUNTRY;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Rejected configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address {value:?}: {source}")]
    ListenAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("response status {0} is not a valid HTTP status code")]
    ResponseStatus(u16),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server settings
    pub listen_addr: String,
    pub debug: bool,

    // Access policy
    pub allowed_countries: Vec<String>,
    pub allow_local: bool,
    pub local_country: String,
    pub fallback_allow: bool,

    // Providers
    pub api_provider: String,
    pub fallback_providers: Vec<String>,
    pub ipinfo_token: Option<String>,
    pub ipdata_api_key: Option<String>,
    pub ip_api_ir_guid: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry_count: u32,

    // Cache
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,

    // Denial rendering
    pub msg_not_allowed: String,
    pub msg_api_error: String,
    pub response_status: u16,
    pub json_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        let providers = ProviderConfig::default();
        let messages = Messages::default();
        let response = ResponseSettings::default();
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            debug: false,
            allowed_countries: vec!["IR".to_string()],
            allow_local: true,
            local_country: DEFAULT_LOCAL_COUNTRY.to_string(),
            fallback_allow: true,
            api_provider: providers.primary,
            fallback_providers: providers.fallbacks,
            ipinfo_token: None,
            ipdata_api_key: None,
            ip_api_ir_guid: None,
            timeout_secs: providers.timeout.as_secs(),
            connect_timeout_secs: providers.connect_timeout.as_secs(),
            retry_count: providers.retry_count,
            cache_enabled: true,
            cache_ttl_secs: 3600,
            msg_not_allowed: messages.not_allowed,
            msg_api_error: messages.api_error,
            response_status: response.status_code,
            json_response: response.json_response,
        }
    }
}

impl Config {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            primary: self.api_provider.clone(),
            fallbacks: self.fallback_providers.clone(),
            credentials: ProviderCredentials {
                ipinfo_token: self.ipinfo_token.clone(),
                ipdata_api_key: self.ipdata_api_key.clone(),
                ip_api_ir_guid: self.ip_api_ir_guid.clone(),
            },
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            retry_count: self.retry_count,
        }
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(&self.allowed_countries)
            .allow_local(self.allow_local)
            .local_country(self.local_country.clone())
            .fallback_allow(self.fallback_allow)
    }

    /// Resolver settings. The resolver and the policy share one fallback knob here.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            providers: self.provider_config(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            local_country: self.local_country.clone(),
            fallback_allow: self.fallback_allow,
            retry_backoff: RETRY_BACKOFF,
        }
    }

    pub fn messages(&self) -> Messages {
        Messages {
            not_allowed: self.msg_not_allowed.clone(),
            api_error: self.msg_api_error.clone(),
        }
    }

    pub fn response_settings(&self) -> ResponseSettings {
        ResponseSettings {
            status_code: self.response_status,
            json_response: self.json_response,
        }
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                value: self.listen_addr.clone(),
                source,
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.listen_socket_addr()?;
        if !(100..=599).contains(&self.response_status) {
            return Err(ConfigError::ResponseStatus(self.response_status));
        }
        Ok(())
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn list(value: Option<String>) -> Option<Vec<String>> {
    value.map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn number<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(load_config_from(|key| std::env::var(key).ok())?)
}

/// Build the configuration from any variable source.
pub fn load_config_from<F>(var: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = var("GEOGATE_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let debug = var("DEBUG").is_some();

    // Access policy
    let allowed_countries =
        list(var("GEOGATE_ALLOWED_COUNTRIES")).unwrap_or(defaults.allowed_countries);

    let allow_local = flag(var("GEOGATE_ALLOW_LOCAL"), defaults.allow_local);

    let local_country = var("GEOGATE_LOCAL_COUNTRY")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(defaults.local_country);

    let fallback_allow = flag(var("GEOGATE_FALLBACK_ALLOW"), defaults.fallback_allow);

    // Providers
    let api_provider = var("GEOGATE_API_PROVIDER")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.api_provider);

    let fallback_providers =
        list(var("GEOGATE_FALLBACK_PROVIDERS")).unwrap_or(defaults.fallback_providers);

    let ipinfo_token = var("GEOGATE_IPINFO_TOKEN").filter(|v| !v.is_empty());
    let ipdata_api_key = var("GEOGATE_IPDATA_API_KEY").filter(|v| !v.is_empty());
    let ip_api_ir_guid = var("GEOGATE_IP_API_IR_GUID").filter(|v| !v.is_empty());

    let timeout_secs = number(var("GEOGATE_TIMEOUT_SECS"), defaults.timeout_secs);
    let connect_timeout_secs = number(
        var("GEOGATE_CONNECT_TIMEOUT_SECS"),
        defaults.connect_timeout_secs,
    );
    let retry_count = number(var("GEOGATE_RETRY_COUNT"), defaults.retry_count);

    // Cache
    let cache_enabled = flag(var("GEOGATE_CACHE_ENABLED"), defaults.cache_enabled);
    let cache_ttl_secs = number(var("GEOGATE_CACHE_TTL_SECS"), defaults.cache_ttl_secs);

    // Denial rendering
    let msg_not_allowed = var("GEOGATE_MSG_NOT_ALLOWED").unwrap_or(defaults.msg_not_allowed);
    let msg_api_error = var("GEOGATE_MSG_API_ERROR").unwrap_or(defaults.msg_api_error);
    let response_status = number(var("GEOGATE_RESPONSE_STATUS"), defaults.response_status);
    let json_response = flag(var("GEOGATE_JSON_RESPONSE"), defaults.json_response);

    let config = Config {
        listen_addr,
        debug,
        allowed_countries,
        allow_local,
        local_country,
        fallback_allow,
        api_provider,
        fallback_providers,
        ipinfo_token,
        ipdata_api_key,
        ip_api_ir_guid,
        timeout_secs,
        connect_timeout_secs,
        retry_count,
        cache_enabled,
        cache_ttl_secs,
        msg_not_allowed,
        msg_api_error,
        response_status,
        json_response,
    };
    config.validate()?;
    Ok(config)
}
