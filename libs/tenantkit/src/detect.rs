//! Tenant context resolution.
//!
//! The resolver walks a fixed list of detectors (environment, domain, port,
//! header) and returns the first match. Precedence is positional: an
//! environment match always wins over a domain match, regardless of the
//! confidence values either would report. Confidence is carried for logging
//! and debugging only.
//!
//! Resolution is total. When no detector matches (or a detector hits an
//! unexpected condition), the configured default identity is returned with
//! the fallback confidence and the condition is logged at warn level.

use crate::config::DetectorToggles;
use crate::identity::{DetectionMethod, DetectionResult, DetectionSignals, TenantIdentity};
use crate::registry::TenantRegistry;

/// Explicit business-mode environment variable. Highest-trust signal.
pub const BUSINESS_MODE_VAR: &str = "BUSINESS_MODE";

/// Explicit business-context request header.
pub const BUSINESS_CONTEXT_HEADER: &str = "x-business-context";

/// Host-style header consulted when no explicit context header is present.
pub const HOST_HEADER: &str = "host";

/// Confidence reported for an explicit business-mode variable match.
pub const CONFIDENCE_ENV_MODE: f64 = 0.95;
/// Confidence reported for a recognized per-tenant variable/value pair.
pub const CONFIDENCE_ENV_TENANT: f64 = 0.9;
/// Confidence reported for an exact known-domain match.
pub const CONFIDENCE_DOMAIN_EXACT: f64 = 0.85;
/// Confidence reported for a heuristic subdomain-prefix match.
pub const CONFIDENCE_DOMAIN_PREFIX: f64 = 0.7;
/// Confidence reported for a port-table match.
pub const CONFIDENCE_PORT: f64 = 0.8;
/// Confidence reported for an explicit business-context header match.
pub const CONFIDENCE_HEADER: f64 = 0.9;
/// Confidence reported when falling back to the configured default.
pub const CONFIDENCE_FALLBACK: f64 = 0.1;

/// Resolves which tenant the current process instance represents.
#[derive(Debug, Clone)]
pub struct ContextResolver<'a> {
    registry: &'a TenantRegistry,
    toggles: DetectorToggles,
    default_identity: TenantIdentity,
}

impl<'a> ContextResolver<'a> {
    /// Creates a resolver over registry data.
    ///
    /// `default_identity` is returned by the fallback path; pass
    /// [`TenantIdentity::Unknown`] to make total failure explicit.
    #[must_use]
    pub fn new(
        registry: &'a TenantRegistry,
        toggles: DetectorToggles,
        default_identity: TenantIdentity,
    ) -> Self {
        Self {
            registry,
            toggles,
            default_identity,
        }
    }

    /// Resolves the tenant identity from the given signals. Never fails.
    #[must_use]
    pub fn detect(&self, signals: &DetectionSignals) -> DetectionResult {
        let steps: [(bool, fn(&Self, &DetectionSignals) -> Option<DetectionResult>); 4] = [
            (self.toggles.environment, Self::detect_environment),
            (self.toggles.domain, Self::detect_domain),
            (self.toggles.port, Self::detect_port),
            (self.toggles.header, Self::detect_header),
        ];

        for (enabled, step) in steps {
            if !enabled {
                continue;
            }
            if let Some(result) = step(self, signals) {
                tracing::debug!(
                    identity = %result.identity,
                    method = %result.method,
                    confidence = result.confidence,
                    "tenant context resolved"
                );
                return result;
            }
        }

        tracing::warn!(
            default = %self.default_identity,
            "no detection signal matched; falling back to the default identity"
        );
        DetectionResult::new(
            self.default_identity,
            DetectionMethod::Environment,
            CONFIDENCE_FALLBACK,
        )
        .with_meta("reason", "fallback")
    }

    /// Environment detection: the explicit business-mode variable first,
    /// then any recognized per-tenant variable/value pair.
    fn detect_environment(&self, signals: &DetectionSignals) -> Option<DetectionResult> {
        if let Some(value) = signals.environment.get(BUSINESS_MODE_VAR) {
            if let Some(identity) = TenantIdentity::from_slug(value) {
                return Some(
                    DetectionResult::new(identity, DetectionMethod::Environment, CONFIDENCE_ENV_MODE)
                        .with_meta("variable", BUSINESS_MODE_VAR),
                );
            }
            tracing::warn!(
                value = %value,
                "{BUSINESS_MODE_VAR} is set but names no known tenant; ignoring"
            );
        }

        for tenant in self.registry.iter() {
            for (key, expected) in &tenant.environment {
                if signals.environment.get(key) == Some(expected) {
                    return Some(
                        DetectionResult::new(
                            tenant.identity,
                            DetectionMethod::Environment,
                            CONFIDENCE_ENV_TENANT,
                        )
                        .with_meta("variable", key.clone()),
                    );
                }
            }
        }
        None
    }

    fn detect_domain(&self, signals: &DetectionSignals) -> Option<DetectionResult> {
        let domain = signals.domain.as_deref()?;
        self.match_domain(domain, DetectionMethod::Domain)
    }

    /// Matches an observed domain against registry data: a configured
    /// domain contained in the observed name wins; otherwise the first
    /// DNS label is tried as a tenant slug.
    fn match_domain(&self, observed: &str, method: DetectionMethod) -> Option<DetectionResult> {
        let observed = observed.trim().to_ascii_lowercase();
        if observed.is_empty() {
            return None;
        }

        for tenant in self.registry.iter() {
            for known in &tenant.domains {
                if observed == *known || observed.contains(known.as_str()) {
                    return Some(
                        DetectionResult::new(tenant.identity, method, CONFIDENCE_DOMAIN_EXACT)
                            .with_meta("matched_domain", known.clone()),
                    );
                }
            }
        }

        let prefix = observed.split('.').next()?;
        let identity = TenantIdentity::from_slug(prefix)?;
        Some(
            DetectionResult::new(identity, method, CONFIDENCE_DOMAIN_PREFIX)
                .with_meta("subdomain", prefix),
        )
    }

    fn detect_port(&self, signals: &DetectionSignals) -> Option<DetectionResult> {
        let port = signals.port?;
        for tenant in self.registry.iter() {
            if tenant.ports.contains(&port) {
                return Some(
                    DetectionResult::new(tenant.identity, DetectionMethod::Port, CONFIDENCE_PORT)
                        .with_meta("port", port.to_string()),
                );
            }
        }
        None
    }

    /// Header detection: the explicit context header when present,
    /// otherwise domain matching re-run against the Host header.
    fn detect_header(&self, signals: &DetectionSignals) -> Option<DetectionResult> {
        if let Some(value) = signals.headers.get(BUSINESS_CONTEXT_HEADER) {
            if let Some(identity) = TenantIdentity::from_slug(value) {
                return Some(
                    DetectionResult::new(identity, DetectionMethod::Header, CONFIDENCE_HEADER)
                        .with_meta("header", BUSINESS_CONTEXT_HEADER),
                );
            }
            tracing::warn!(
                value = %value,
                "{BUSINESS_CONTEXT_HEADER} header names no known tenant; ignoring"
            );
        }

        let host = signals.headers.get(HOST_HEADER)?;
        // Strip any :port suffix before domain matching.
        let host = host.rsplit_once(':').map_or(host.as_str(), |(h, _)| h);
        self.match_domain(host, DetectionMethod::Header)
            .map(|r| r.with_meta("source", "host-header"))
    }
}
