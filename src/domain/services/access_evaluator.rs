//! Access Evaluation
//!
//! Pure domain logic mapping a resolution outcome onto an allow/deny decision.

use crate::domain::entities::{AccessDecision, AccessPolicy, Resolution, ResolutionSource};
use crate::domain::errors::ResolveError;
use crate::domain::value_objects::DecisionReason;

/// Apply the policy to the outcome of a resolution.
///
/// A resolver error is converted to `fallback_allow` here, independently of
/// whatever fallback the resolver itself applied. An absent country means every
/// provider failed and is treated as allowed.
pub fn evaluate(
    policy: &AccessPolicy,
    outcome: Result<&Resolution, &ResolveError>,
) -> AccessDecision {
    let resolution = match outcome {
        Ok(resolution) => resolution,
        Err(_) => {
            return AccessDecision {
                allowed: policy.fallback_allow,
                resolved_country: None,
                reason: if policy.fallback_allow {
                    DecisionReason::ProviderExhaustedFallbackAllow
                } else {
                    DecisionReason::ProviderExhaustedFallbackDeny
                },
            };
        }
    };

    let Some(country) = resolution.country.as_deref() else {
        return AccessDecision {
            allowed: true,
            resolved_country: None,
            reason: DecisionReason::ProviderExhaustedFallbackAllow,
        };
    };

    if country == policy.local_country {
        return AccessDecision {
            allowed: policy.allow_local,
            resolved_country: Some(country.to_string()),
            reason: DecisionReason::Local,
        };
    }

    let reason = match resolution.source {
        ResolutionSource::Cdn => DecisionReason::Cdn,
        ResolutionSource::Cache => DecisionReason::Cache,
        ResolutionSource::Local => DecisionReason::Local,
        ResolutionSource::Provider(_) => DecisionReason::ProviderSuccess,
        ResolutionSource::Exhausted => DecisionReason::ProviderExhaustedFallbackAllow,
    };

    let country = country.to_uppercase();
    AccessDecision {
        allowed: policy.allowed_countries().contains(&country),
        resolved_country: Some(country),
        reason,
    }
}
