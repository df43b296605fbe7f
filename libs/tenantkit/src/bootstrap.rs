//! The run-once bootstrap pipeline.
//!
//! Phase order: detect → select → load → merge. The pipeline runs once per
//! process lifetime, sequentially, and hands its merged configuration back
//! to the hosting framework. Nothing here escapes to the host's boot
//! sequence except the strict-mode selection errors — everything else
//! degrades with a log line.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::{FeatureModuleDescriptor, ModuleCatalog, ModuleToggles, SelectError};
use crate::config::BootstrapOptions;
use crate::contracts::LoadCtx;
use crate::detect::ContextResolver;
use crate::identity::{DetectionResult, DetectionSignals};
use crate::loader::{LoadReport, ModuleLoader};
use crate::merge::{MergeOutcome, ValidationReport, merge, validate_config};
use crate::registry::TenantRegistry;

/// Everything one bootstrap run produced. Immutable after completion.
#[derive(Debug)]
pub struct BootReport {
    /// How the tenant context was resolved.
    pub detection: DetectionResult,
    /// The modules that were selected, in load order.
    pub selection: Vec<FeatureModuleDescriptor>,
    /// Per-module load outcomes.
    pub load: LoadReport,
    /// The merged host configuration.
    pub config: Value,
    /// Environment variables for the caller to apply
    /// (see [`crate::merge::effective_env_exports`]).
    pub env_exports: BTreeMap<String, String>,
    /// Validation verdict over the merged configuration.
    pub validation: ValidationReport,
}

/// The bootstrap runtime: owns the registries and drives the phases.
#[derive(Debug)]
pub struct Bootstrap {
    registry: TenantRegistry,
    catalog: ModuleCatalog,
    loader: ModuleLoader,
    options: BootstrapOptions,
}

impl Bootstrap {
    /// Assembles a pipeline from its four parts.
    #[must_use]
    pub fn new(
        registry: TenantRegistry,
        catalog: ModuleCatalog,
        loader: ModuleLoader,
        options: BootstrapOptions,
    ) -> Self {
        Self {
            registry,
            catalog,
            loader,
            options,
        }
    }

    /// The tenant registry this pipeline resolves against.
    #[must_use]
    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Replaces a tenant registry entry wholesale.
    pub fn update_tenant(&mut self, config: crate::registry::TenantConfiguration) {
        self.registry.update(config);
    }

    /// Runs the full pipeline once.
    ///
    /// # Errors
    /// Only strict-mode dependency problems propagate
    /// ([`SelectError::DependencyCycle`], [`SelectError::MissingDependency`]);
    /// every other failure degrades and is visible in the returned report.
    pub async fn run(
        &self,
        signals: &DetectionSignals,
        base: &Value,
    ) -> Result<BootReport, SelectError> {
        tracing::info!("Phase: detect");
        let resolver = ContextResolver::new(
            &self.registry,
            self.options.detectors,
            self.options.default_identity,
        );
        let detection = resolver.detect(signals);
        tracing::info!(
            identity = %detection.identity,
            method = %detection.method,
            confidence = detection.confidence,
            "tenant context resolved"
        );
        let tenant = self.registry.get(detection.identity);

        tracing::info!("Phase: select");
        let toggles = ModuleToggles::from_env_map(&signals.environment);
        let selection = self.catalog.select(
            detection.identity,
            tenant,
            &toggles,
            self.options.dependency_mode,
        )?;
        tracing::info!(modules = selection.len(), "module selection complete");

        tracing::info!("Phase: load");
        let ctx = LoadCtx {
            identity: detection.identity,
            display_name: tenant.map_or_else(String::new, |t| t.display_name.clone()),
            features: tenant.map_or_else(BTreeMap::new, |t| t.settings.features.clone()),
        };
        let load = self
            .loader
            .load(&selection, &ctx, self.options.load_budget())
            .await;

        tracing::info!("Phase: merge");
        let MergeOutcome {
            config,
            env_exports,
        } = merge(base, detection.identity, tenant, &load);
        let validation = validate_config(&config);
        if validation.is_valid() {
            tracing::info!("bootstrap complete");
        } else {
            tracing::warn!(
                issues = validation.issues.len(),
                "bootstrap complete with configuration validation issues"
            );
        }

        Ok(BootReport {
            detection,
            selection,
            load,
            config,
            env_exports,
            validation,
        })
    }
}
