//! Module loading.
//!
//! The loader owns an explicit registration table mapping module names to
//! factory functions; there is no runtime lookup by import path. Modules
//! load sequentially in selection order. A failing module is recorded and
//! skipped, never retried, and never aborts its siblings. The load budget
//! is soft: total elapsed time is compared after the fact and logged.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::FeatureModuleDescriptor;
use crate::contracts::{FeatureModule, LoadCtx, ModuleFactory};

/// One successfully loaded module.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Module name.
    pub name: String,
    /// The configuration fragment the module contributed.
    pub fragment: serde_json::Value,
    /// Time spent instantiating and initializing the module.
    pub elapsed: Duration,
}

/// One module that failed to load.
#[derive(Debug, Clone)]
pub struct ModuleFailure {
    /// Module name.
    pub name: String,
    /// Rendered error chain.
    pub error: String,
    /// Time spent before the failure.
    pub elapsed: Duration,
}

/// Outcome of one load phase. Produced once per pipeline run; read-only
/// afterward.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Modules that loaded, in load order.
    pub loaded: Vec<LoadedModule>,
    /// Modules that failed, in attempt order.
    pub failures: Vec<ModuleFailure>,
    /// Total wall-clock time of the load phase.
    pub elapsed: Duration,
}

impl LoadReport {
    /// Names of the modules that loaded, in load order.
    #[must_use]
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|m| m.name.as_str()).collect()
    }

    /// Returns `true` when at least one module failed to load.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Module loader with an explicit name → factory registration table.
#[derive(Default)]
pub struct ModuleLoader {
    factories: BTreeMap<String, ModuleFactory>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("registered", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLoader {
    /// An empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a module name, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn FeatureModule> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Builder-style [`ModuleLoader::register`].
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn FeatureModule> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Returns `true` when a factory is registered for the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Loads the selected modules sequentially.
    ///
    /// `budget` is the soft load budget; exceeding it produces a warning
    /// after the fact, nothing is interrupted.
    pub async fn load(
        &self,
        selection: &[FeatureModuleDescriptor],
        ctx: &LoadCtx,
        budget: Duration,
    ) -> LoadReport {
        let phase_started = Instant::now();
        let mut report = LoadReport::default();

        for descriptor in selection {
            let started = Instant::now();
            match self.load_one(descriptor, ctx).await {
                Ok(fragment) => {
                    let elapsed = started.elapsed();
                    tracing::debug!(module = %descriptor.name, ?elapsed, "module loaded");
                    report.loaded.push(LoadedModule {
                        name: descriptor.name.clone(),
                        fragment,
                        elapsed,
                    });
                }
                Err(error) => {
                    let elapsed = started.elapsed();
                    tracing::warn!(module = %descriptor.name, %error, "module failed to load");
                    report.failures.push(ModuleFailure {
                        name: descriptor.name.clone(),
                        error,
                        elapsed,
                    });
                }
            }
        }

        report.elapsed = phase_started.elapsed();
        if report.elapsed > budget {
            tracing::warn!(
                elapsed = ?report.elapsed,
                budget = ?budget,
                "module load phase exceeded its soft budget"
            );
        }
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "module load phase complete"
        );
        report
    }

    async fn load_one(
        &self,
        descriptor: &FeatureModuleDescriptor,
        ctx: &LoadCtx,
    ) -> Result<serde_json::Value, String> {
        let factory = self
            .factories
            .get(&descriptor.name)
            .ok_or_else(|| format!("no factory registered for module '{}'", descriptor.name))?;
        let module = factory();
        module
            .init(ctx)
            .await
            .map_err(|e| format!("{e:#}"))?;
        Ok(module.config_fragment(ctx))
    }
}
