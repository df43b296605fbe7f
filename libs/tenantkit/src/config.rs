//! Bootstrap options.
//!
//! Options follow the layered loading order used across this workspace:
//! typed defaults, then an optional JSON file, then `TENANTKIT_*`
//! environment variables (nested fields separated by `__`).

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};

use crate::catalog::DependencyMode;
use crate::identity::TenantIdentity;

/// Options error for layered loading.
#[derive(thiserror::Error, Debug)]
pub enum OptionsError {
    #[error("invalid bootstrap options: {source}")]
    Load {
        #[from]
        source: figment::Error,
    },
}

/// Per-step switches for the context resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorToggles {
    /// Environment-variable detection.
    pub environment: bool,
    /// Domain-name detection.
    pub domain: bool,
    /// Port-number detection.
    pub port: bool,
    /// Header detection.
    pub header: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            environment: true,
            domain: true,
            port: true,
            header: true,
        }
    }
}

/// Logging options consumed by [`crate::telemetry::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingOptions {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON-formatted lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

/// Options for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapOptions {
    /// Identity returned by the detection fallback path.
    pub default_identity: TenantIdentity,
    /// Whether missing dependencies and cycles abort the pipeline or are
    /// skipped with a warning.
    pub dependency_mode: DependencyMode,
    /// Per-step detection switches.
    pub detectors: DetectorToggles,
    /// Soft budget for the module load phase, in milliseconds. Compared
    /// after the fact and logged; never enforced by preemption.
    pub load_budget_ms: u64,
    /// Logging options.
    pub logging: LoggingOptions,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            default_identity: TenantIdentity::Unknown,
            dependency_mode: DependencyMode::default(),
            detectors: DetectorToggles::default(),
            load_budget_ms: 30_000,
            logging: LoggingOptions::default(),
        }
    }
}

impl BootstrapOptions {
    /// The load budget as a [`Duration`].
    #[must_use]
    pub const fn load_budget(&self) -> Duration {
        Duration::from_millis(self.load_budget_ms)
    }

    /// Loads options with the defaults → JSON file → environment layering.
    ///
    /// # Errors
    /// Returns [`OptionsError::Load`] when a layer cannot be read or the
    /// merged document does not deserialize.
    pub fn load_or_default(file: Option<&Path>) -> Result<Self, OptionsError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Json::file(path));
        }
        let options = figment
            .merge(Env::prefixed("TENANTKIT_").split("__"))
            .extract()?;
        Ok(options)
    }
}
