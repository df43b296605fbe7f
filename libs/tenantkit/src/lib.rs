//! tenantkit — tenant context detection, module selection and
//! configuration merging for multi-tenant hosts.
//!
//! One codebase serves several business deployments ("tenants"). At
//! process startup the host runs a single pass through this kit:
//!
//! 1. **Detect** which tenant the instance represents, from explicit
//!    environment variables, the domain name, the listening port or
//!    request headers ([`detect`]).
//! 2. **Select** the feature modules that tenant gets — the core set, the
//!    tenant's business modules and the shared set minus exclusions —
//!    ordered by declared dependencies ([`catalog`]).
//! 3. **Load** the selected modules through an explicit name → factory
//!    registration table ([`loader`]).
//! 4. **Merge** the tenant's settings and the modules' configuration
//!    fragments into the host's base configuration ([`merge`]).
//!
//! The pipeline is deliberately boring: one pass, sequential awaits, no
//! retries, and no failure path that crashes the host's boot sequence —
//! the only errors that propagate are strict-mode dependency problems.
//!
//! ```
//! use serde_json::json;
//! use tenantkit::{
//!     Bootstrap, BootstrapOptions, DetectionSignals, ModuleCatalog, ModuleLoader,
//!     TenantRegistry,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tenantkit::SelectError> {
//! let pipeline = Bootstrap::new(
//!     TenantRegistry::builtin(),
//!     ModuleCatalog::new(),
//!     ModuleLoader::new(),
//!     BootstrapOptions::default(),
//! );
//! let signals = DetectionSignals::default().with_domain("capacita.localhost");
//! let report = pipeline.run(&signals, &json!({})).await?;
//! assert_eq!(report.detection.identity.as_str(), "capacita");
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod detect;
pub mod identity;
pub mod loader;
pub mod merge;
pub mod registry;
pub mod telemetry;

pub use bootstrap::{BootReport, Bootstrap};
pub use catalog::{
    DependencyMode, FeatureModuleDescriptor, ModuleCatalog, ModuleCategory, ModuleToggles,
    SelectError,
};
pub use config::{BootstrapOptions, DetectorToggles, LoggingOptions, OptionsError};
pub use contracts::{FeatureModule, LoadCtx, ModuleFactory};
pub use detect::ContextResolver;
pub use identity::{DetectionMethod, DetectionResult, DetectionSignals, TenantIdentity};
pub use loader::{LoadReport, LoadedModule, ModuleFailure, ModuleLoader};
pub use merge::{
    MergeOutcome, ValidationReport, effective_env_exports, merge, validate_config,
};
pub use registry::{
    RegistryError, SecuritySettings, TenantConfiguration, TenantRegistry, TenantSettings,
};
