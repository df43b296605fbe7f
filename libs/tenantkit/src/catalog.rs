//! Module catalog and selection.
//!
//! Selection is pure: given the static catalog, a tenant identity and the
//! explicit toggles, it returns the descriptors to load, in load order.
//! Instantiation belongs to [`crate::loader::ModuleLoader`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::identity::TenantIdentity;
use crate::registry::TenantConfiguration;

/// Selection error. Only raised in [`DependencyMode::Strict`]; the
/// permissive mode degrades to warnings.
#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    #[error("dependency cycle among modules: {}", members.join(", "))]
    DependencyCycle { members: Vec<String> },
    #[error("module '{module}' depends on '{dependency}' which is not in the candidate set")]
    MissingDependency { module: String, dependency: String },
}

/// Whether dependency problems abort the pipeline or degrade to warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
    /// Skip modules with missing or cyclic dependencies, with a warning.
    #[default]
    Permissive,
    /// Abort the whole selection on the first dependency problem.
    Strict,
}

/// Classification of a feature module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    /// Loaded for every tenant, cannot be toggled off.
    Core,
    /// Loaded for every tenant unless excluded or toggled off.
    Shared,
    /// Loaded only for tenants that list the module.
    Business,
}

/// Static description of one feature module. Registry data, never created
/// at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureModuleDescriptor {
    /// Unique module name.
    pub name: String,
    /// Classification driving selection.
    pub category: ModuleCategory,
    /// Lower loads first among modules whose dependencies are satisfied.
    pub load_priority: i32,
    /// Names of modules that must load before this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Tenants this module supports. Empty means all tenants.
    #[serde(default)]
    pub supported_tenants: Vec<TenantIdentity>,
    /// Disabled descriptors are skipped unless explicitly toggled on.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl FeatureModuleDescriptor {
    /// A new enabled descriptor with no dependencies, supporting all
    /// tenants.
    #[must_use]
    pub fn new(name: impl Into<String>, category: ModuleCategory, load_priority: i32) -> Self {
        Self {
            name: name.into(),
            category,
            load_priority,
            depends_on: Vec::new(),
            supported_tenants: Vec::new(),
            enabled: true,
        }
    }

    /// Declares dependencies on other modules.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = &'static str>) -> Self {
        self.depends_on = deps.into_iter().map(str::to_owned).collect();
        self
    }

    /// Restricts the module to specific tenants.
    #[must_use]
    pub fn supported_by(mut self, tenants: impl IntoIterator<Item = TenantIdentity>) -> Self {
        self.supported_tenants = tenants.into_iter().collect();
        self
    }

    /// Marks the descriptor disabled by default.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn supports(&self, identity: TenantIdentity) -> bool {
        self.supported_tenants.is_empty() || self.supported_tenants.contains(&identity)
    }
}

/// Explicit module toggles, parsed from environment-style flags.
///
/// `ENABLE_<NAME>=true` force-enables an optional module;
/// `PLUGIN_<NAME>_ENABLED=false` disables one. Module names in flags use
/// uppercase with underscores (`PLUGIN_CONTACT_FORMS_ENABLED` toggles
/// `contact-forms`). Core modules are never affected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleToggles {
    enabled: BTreeSet<String>,
    disabled: BTreeSet<String>,
}

impl ModuleToggles {
    /// Parses toggles from an environment-variable map.
    #[must_use]
    pub fn from_env_map(env: &BTreeMap<String, String>) -> Self {
        let mut toggles = Self::default();
        for (key, value) in env {
            if let Some(name) = key.strip_prefix("ENABLE_") {
                if truthy(value) {
                    toggles.enabled.insert(flag_to_module_name(name));
                }
            } else if let Some(name) = key
                .strip_prefix("PLUGIN_")
                .and_then(|rest| rest.strip_suffix("_ENABLED"))
            {
                if truthy(value) {
                    toggles.enabled.insert(flag_to_module_name(name));
                } else {
                    toggles.disabled.insert(flag_to_module_name(name));
                }
            }
        }
        toggles
    }

    /// Force-enables a module by name.
    #[must_use]
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        self.enabled.insert(name.into());
        self
    }

    /// Disables a module by name.
    #[must_use]
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.disabled.insert(name.into());
        self
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn flag_to_module_name(flag: &str) -> String {
    flag.to_ascii_lowercase().replace('_', "-")
}

/// The static module registry.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, FeatureModuleDescriptor>,
}

impl ModuleCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, replacing any previous one with the same name.
    #[must_use]
    pub fn with(mut self, descriptor: FeatureModuleDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Adds a descriptor, replacing any previous one with the same name.
    pub fn insert(&mut self, descriptor: FeatureModuleDescriptor) {
        self.modules.insert(descriptor.name.clone(), descriptor);
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureModuleDescriptor> {
        self.modules.get(name)
    }

    /// Number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` when the catalog holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Selects the modules to load for a tenant, in load order.
    ///
    /// The candidate set is the core set, then the tenant's business
    /// modules, then the shared set minus the tenant's exclusions. The
    /// result is topologically sorted by declared dependencies, ties broken
    /// by ascending `load_priority`, then name.
    ///
    /// # Errors
    /// In [`DependencyMode::Strict`], returns [`SelectError`] for a missing
    /// dependency or a dependency cycle. The permissive mode skips the
    /// offending modules with a warning and never fails.
    pub fn select(
        &self,
        identity: TenantIdentity,
        tenant: Option<&TenantConfiguration>,
        toggles: &ModuleToggles,
        mode: DependencyMode,
    ) -> Result<Vec<FeatureModuleDescriptor>, SelectError> {
        let mut candidates: BTreeMap<&str, &FeatureModuleDescriptor> = BTreeMap::new();

        // 1. The core set, identical across all tenants.
        for descriptor in self.by_category(ModuleCategory::Core) {
            candidates.insert(descriptor.name.as_str(), descriptor);
        }

        // 2. Business modules keyed by identity: required always, optional
        //    behind a toggle.
        if let Some(tenant) = tenant {
            for name in &tenant.required_modules {
                self.add_business_candidate(&mut candidates, name, identity);
            }
            for name in &tenant.optional_modules {
                if toggles.is_enabled(name) {
                    self.add_business_candidate(&mut candidates, name, identity);
                } else {
                    tracing::debug!(module = %name, "optional module not toggled on; skipping");
                }
            }
        }

        // 3. The shared set minus tenant exclusions.
        let excluded: BTreeSet<&str> = tenant
            .map(|t| t.excluded_shared_modules.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for descriptor in self.by_category(ModuleCategory::Shared) {
            if excluded.contains(descriptor.name.as_str()) {
                tracing::debug!(module = %descriptor.name, "shared module excluded by tenant");
                continue;
            }
            candidates.insert(descriptor.name.as_str(), descriptor);
        }

        // Toggles: disable flags remove anything non-core; enable flags
        // resurrect descriptors that are disabled by default.
        candidates.retain(|name, descriptor| {
            if descriptor.category != ModuleCategory::Core && toggles.is_disabled(name) {
                tracing::debug!(module = %name, "module disabled by toggle");
                return false;
            }
            if !descriptor.enabled && !toggles.is_enabled(name) {
                tracing::debug!(module = %name, "module disabled in catalog");
                return false;
            }
            true
        });

        sort_by_dependencies(candidates, mode)
    }

    fn add_business_candidate<'a>(
        &'a self,
        candidates: &mut BTreeMap<&'a str, &'a FeatureModuleDescriptor>,
        name: &str,
        identity: TenantIdentity,
    ) {
        let Some(descriptor) = self.modules.get(name) else {
            tracing::warn!(module = %name, "tenant references a module missing from the catalog");
            return;
        };
        if !descriptor.supports(identity) {
            tracing::warn!(
                module = %name,
                tenant = %identity,
                "tenant references a module that does not support it"
            );
            return;
        }
        candidates.insert(descriptor.name.as_str(), descriptor);
    }

    fn by_category(&self, category: ModuleCategory) -> impl Iterator<Item = &FeatureModuleDescriptor> {
        self.modules.values().filter(move |d| d.category == category)
    }
}

/// Kahn's algorithm over the candidate set. Ready modules are picked in
/// `(load_priority, name)` order, which makes the output deterministic and
/// implements the priority tie-break.
fn sort_by_dependencies(
    mut candidates: BTreeMap<&str, &FeatureModuleDescriptor>,
    mode: DependencyMode,
) -> Result<Vec<FeatureModuleDescriptor>, SelectError> {
    // Missing dependencies first: drop (or abort on) modules whose
    // dependencies are outside the candidate set, repeating until stable
    // since each removal can orphan further dependents.
    loop {
        let mut missing: Option<(String, String)> = None;
        for (name, descriptor) in &candidates {
            if let Some(dep) = descriptor
                .depends_on
                .iter()
                .find(|dep| !candidates.contains_key(dep.as_str()))
            {
                missing = Some(((*name).to_owned(), dep.clone()));
                break;
            }
        }
        let Some((module, dependency)) = missing else {
            break;
        };
        if mode == DependencyMode::Strict {
            return Err(SelectError::MissingDependency { module, dependency });
        }
        tracing::warn!(
            module = %module,
            dependency = %dependency,
            "skipping module with unsatisfied dependency"
        );
        candidates.remove(module.as_str());
    }

    let mut indegree: BTreeMap<&str, usize> = candidates
        .values()
        .map(|d| (d.name.as_str(), d.depends_on.len()))
        .collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for descriptor in candidates.values() {
        for dep in &descriptor.depends_on {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(descriptor.name.as_str());
        }
    }

    let mut ready: Vec<&FeatureModuleDescriptor> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| candidates[name])
        .collect();
    let mut sorted = Vec::with_capacity(candidates.len());

    while !ready.is_empty() {
        ready.sort_by(|a, b| {
            a.load_priority
                .cmp(&b.load_priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        let next = ready.remove(0);
        sorted.push(next.clone());
        for dependent in dependents.get(next.name.as_str()).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(candidates[dependent]);
                }
            }
        }
    }

    if sorted.len() < candidates.len() {
        let mut members: Vec<String> = candidates
            .keys()
            .filter(|name| !sorted.iter().any(|d| d.name == **name))
            .map(|name| (*name).to_owned())
            .collect();
        members.sort();
        if mode == DependencyMode::Strict {
            return Err(SelectError::DependencyCycle { members });
        }
        tracing::warn!(
            members = %members.join(", "),
            "skipping modules forming a dependency cycle"
        );
    }

    Ok(sorted)
}
