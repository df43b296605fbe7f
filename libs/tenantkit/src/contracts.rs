//! Module contracts: the seam between the kit and feature modules.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::identity::TenantIdentity;

/// Context handed to a feature module during the load phase.
#[derive(Debug, Clone, Default)]
pub struct LoadCtx {
    /// The tenant this process instance represents.
    pub identity: TenantIdentity,
    /// Human-readable tenant name ("" when the identity is unknown).
    pub display_name: String,
    /// The tenant's active feature flags.
    pub features: BTreeMap<String, bool>,
}

impl LoadCtx {
    /// Returns `true` when the named feature flag is on.
    #[must_use]
    pub fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}

/// A named, independently-loadable feature unit.
///
/// Modules are instantiated through the registration table in
/// [`crate::loader::ModuleLoader`]; the kit never imports them by name at
/// runtime.
#[async_trait]
pub trait FeatureModule: Send + Sync + 'static {
    /// Wiring and validation; runs once during the load phase.
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()>;

    /// Configuration fragment shallow-merged into the host configuration.
    ///
    /// Must be a JSON object; anything else is skipped by the merger with
    /// a warning.
    fn config_fragment(&self, ctx: &LoadCtx) -> serde_json::Value;
}

/// Factory producing a module instance. One entry per registered name.
pub type ModuleFactory = Box<dyn Fn() -> Arc<dyn FeatureModule> + Send + Sync>;
