//! Tenant identity and the detection data model.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A business deployment context sharing one codebase but isolated
/// configuration.
///
/// The set of tenants is closed: every deployment resolves to one of the
/// known identities or to [`TenantIdentity::Unknown`]. The identity is
/// resolved once at startup and never changes for the process lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TenantIdentity {
    /// Trading platform.
    Intellitrade,
    /// Training and course platform.
    Capacita,
    /// Payroll platform.
    Salarium,
    /// No tenant could be determined.
    #[default]
    Unknown,
}

impl TenantIdentity {
    /// All known identities, excluding [`TenantIdentity::Unknown`].
    pub const KNOWN: [Self; 3] = [Self::Intellitrade, Self::Capacita, Self::Salarium];

    /// Stable lowercase slug, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intellitrade => "intellitrade",
            Self::Capacita => "capacita",
            Self::Salarium => "salarium",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a slug into a known identity. Case-insensitive.
    ///
    /// Returns `None` for anything outside the known set, including the
    /// literal `"unknown"`.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(slug.trim()))
    }

    /// Returns `true` for every identity except [`TenantIdentity::Unknown`].
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for TenantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of signal a detection result was derived from.
///
/// Precedence between methods is positional (the resolver tries them in a
/// fixed order), never numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Environment variables (explicit operator intent).
    Environment,
    /// Request or deployment domain name.
    Domain,
    /// Listening port number.
    Port,
    /// HTTP request headers.
    Header,
}

impl DetectionMethod {
    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Domain => "domain",
            Self::Port => "port",
            Self::Header => "header",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient inputs to tenant detection. Not persisted.
///
/// Header keys are matched case-insensitively; [`DetectionSignals::with_header`]
/// lowercases on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionSignals {
    /// Environment variable snapshot.
    pub environment: BTreeMap<String, String>,
    /// Observed domain name, if any.
    pub domain: Option<String>,
    /// Observed listening port, if any.
    pub port: Option<u16>,
    /// Observed request headers (lowercase keys), if any.
    pub headers: BTreeMap<String, String>,
}

impl DetectionSignals {
    /// Snapshots the process environment into a signal set.
    ///
    /// Captures all environment variables and, when `PORT` holds a valid
    /// port number, the port signal as well. Keeping the snapshot explicit
    /// leaves detection itself a pure function of its inputs.
    #[must_use]
    pub fn from_process_env() -> Self {
        let environment: BTreeMap<String, String> = std::env::vars().collect();
        let port = environment.get("PORT").and_then(|p| p.parse().ok());
        Self {
            environment,
            domain: None,
            port,
            headers: BTreeMap::new(),
        }
    }

    /// Adds an environment variable signal.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Sets the domain signal.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the port signal.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds a header signal. The name is lowercased on insert.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// The outcome of tenant detection. Produced once, read-only afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// The resolved identity.
    pub identity: TenantIdentity,
    /// Which signal kind produced the match.
    pub method: DetectionMethod,
    /// Advisory value in `[0, 1]` for logging and debugging only.
    /// No component branches on it; precedence is method order.
    pub confidence: f64,
    /// Open key/value details about the match (matched variable, domain, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DetectionResult {
    pub(crate) fn new(identity: TenantIdentity, method: DetectionMethod, confidence: f64) -> Self {
        Self {
            identity,
            method,
            confidence,
            metadata: BTreeMap::new(),
        }
    }

    pub(crate) fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }
}
