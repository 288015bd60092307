//! Geo Guard - access control use case
//!
//! Combines the country resolver with an [`AccessPolicy`] and produces the
//! decisions and denials the inbound adapters act on.

use crate::application::CountryResolver;
use crate::domain::entities::{AccessDecision, AccessPolicy, LocationRecord, Resolution, Target};
use crate::domain::errors::{CountryNotAllowed, ResolveError};
use crate::domain::services::evaluate;
use crate::domain::value_objects::DecisionReason;
use std::sync::Arc;

pub const DEFAULT_NOT_ALLOWED_MESSAGE: &str = "Access from your country is not allowed.";
pub const DEFAULT_API_ERROR_MESSAGE: &str = "Unable to determine your location.";

/// User-facing denial texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub not_allowed: String,
    /// Used when the country could not be determined and the policy denies
    pub api_error: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            not_allowed: DEFAULT_NOT_ALLOWED_MESSAGE.to_string(),
            api_error: DEFAULT_API_ERROR_MESSAGE.to_string(),
        }
    }
}

/// How a denial is rendered at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSettings {
    pub status_code: u16,
    pub json_response: bool,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            status_code: 403,
            json_response: true,
        }
    }
}

/// Country allow-list guard.
///
/// Cheap to clone; clones share the resolver and therefore its cache.
#[derive(Clone)]
pub struct GeoGuard {
    resolver: Arc<CountryResolver>,
    policy: AccessPolicy,
    messages: Messages,
    response: ResponseSettings,
}

impl GeoGuard {
    pub fn new(resolver: Arc<CountryResolver>, policy: AccessPolicy) -> Self {
        Self {
            resolver,
            policy,
            messages: Messages::default(),
            response: ResponseSettings::default(),
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_response(mut self, response: ResponseSettings) -> Self {
        self.response = response;
        self
    }

    /// Guard sharing this resolver but applying another policy.
    pub fn with_policy(&self, policy: AccessPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut AccessPolicy {
        &mut self.policy
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn response(&self) -> ResponseSettings {
        self.response
    }

    pub fn resolver(&self) -> &Arc<CountryResolver> {
        &self.resolver
    }

    pub async fn resolve_country(&self, target: Target<'_>) -> Result<Resolution, ResolveError> {
        self.resolver.resolve(target).await
    }

    pub async fn location_details(&self, target: Target<'_>) -> Result<LocationRecord, ResolveError> {
        self.resolver.location_details(target).await
    }

    /// Resolve once and apply the policy.
    pub async fn decide(&self, target: Target<'_>) -> AccessDecision {
        let outcome = self.resolver.resolve(target).await;
        let decision = evaluate(&self.policy, outcome.as_ref());

        tracing::debug!(
            "access {} for {:?} ({})",
            if decision.allowed { "allowed" } else { "denied" },
            decision.resolved_country,
            decision.reason
        );
        decision
    }

    pub async fn is_allowed(&self, target: Target<'_>) -> bool {
        self.decide(target).await.allowed
    }

    /// Fail with [`CountryNotAllowed`] when the target is denied.
    ///
    /// A denied target is resolved a second time to report the detected country.
    /// With the cache enabled the second pass is a cache hit; without it the
    /// providers are queried twice. Use [`decide`](Self::decide) for a single pass.
    pub async fn validate(&self, target: Target<'_>) -> Result<(), CountryNotAllowed> {
        if self.is_allowed(target).await {
            return Ok(());
        }

        let detected_country = self
            .resolver
            .resolve(target)
            .await
            .ok()
            .and_then(|resolution| resolution.country);

        Err(CountryNotAllowed {
            message: self.messages.not_allowed.clone(),
            detected_country,
            allowed_countries: self.policy.allowed_countries().to_vec(),
            code: self.response.status_code,
        })
    }

    /// Build the denial for a decision already taken.
    pub fn denial(&self, decision: &AccessDecision) -> CountryNotAllowed {
        let message = match decision.reason {
            DecisionReason::ProviderExhaustedFallbackDeny => &self.messages.api_error,
            _ => &self.messages.not_allowed,
        };

        CountryNotAllowed {
            message: message.clone(),
            detected_country: decision.resolved_country.clone(),
            allowed_countries: self.policy.allowed_countries().to_vec(),
            code: self.response.status_code,
        }
    }
}

impl std::fmt::Debug for GeoGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoGuard")
            .field("policy", &self.policy)
            .field("messages", &self.messages)
            .field("response", &self.response)
            .finish()
    }
}
