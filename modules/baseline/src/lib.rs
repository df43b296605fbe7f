//! Baseline feature modules for the tenantkit bootstrap pipeline.
//!
//! Ships the module sets the built-in tenant registry refers to:
//!
//! - core: `pages`, `media`, `accounts`
//! - shared: `seo`, `contact-forms`, `search` (disabled by default)
//! - business: `trading-desk`, `course-catalog`, `payroll`
//!
//! [`catalog`] and [`loader`] give a matching descriptor catalog and
//! factory registration table, so a host can bootstrap with one line each:
//!
//! ```
//! use tenantkit::{Bootstrap, BootstrapOptions, TenantRegistry};
//!
//! let pipeline = Bootstrap::new(
//!     TenantRegistry::builtin(),
//!     tenantkit_baseline::catalog(),
//!     tenantkit_baseline::loader(),
//!     BootstrapOptions::default(),
//! );
//! # let _ = pipeline;
//! ```

use std::sync::Arc;

use tenantkit::{FeatureModuleDescriptor, ModuleCatalog, ModuleCategory, ModuleLoader, TenantIdentity};

mod business;
mod content;
mod shared;

pub use business::{CourseCatalogModule, PayrollModule, TradingDeskModule};
pub use content::{AccountsModule, MediaModule, PagesModule};
pub use shared::{ContactFormsModule, SearchModule, SeoModule};

/// Descriptor catalog covering every baseline module.
#[must_use]
pub fn catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with(FeatureModuleDescriptor::new("pages", ModuleCategory::Core, 10))
        .with(FeatureModuleDescriptor::new("media", ModuleCategory::Core, 20))
        .with(
            FeatureModuleDescriptor::new("accounts", ModuleCategory::Core, 30)
                .depends_on(["pages"]),
        )
        .with(FeatureModuleDescriptor::new("seo", ModuleCategory::Shared, 40))
        .with(FeatureModuleDescriptor::new(
            "contact-forms",
            ModuleCategory::Shared,
            50,
        ))
        .with(
            FeatureModuleDescriptor::new("search", ModuleCategory::Shared, 60)
                .depends_on(["pages"])
                .disabled(),
        )
        .with(
            FeatureModuleDescriptor::new("trading-desk", ModuleCategory::Business, 100)
                .depends_on(["accounts"])
                .supported_by([TenantIdentity::Intellitrade]),
        )
        .with(
            FeatureModuleDescriptor::new("course-catalog", ModuleCategory::Business, 100)
                .depends_on(["pages", "media"])
                .supported_by([TenantIdentity::Capacita]),
        )
        .with(
            FeatureModuleDescriptor::new("payroll", ModuleCategory::Business, 100)
                .depends_on(["accounts"])
                .supported_by([TenantIdentity::Salarium]),
        )
}

/// Factory registration table covering every descriptor in [`catalog`].
#[must_use]
pub fn loader() -> ModuleLoader {
    ModuleLoader::new()
        .with("pages", || Arc::new(PagesModule))
        .with("media", || Arc::new(MediaModule))
        .with("accounts", || Arc::new(AccountsModule))
        .with("seo", || Arc::new(SeoModule))
        .with("contact-forms", || Arc::new(ContactFormsModule))
        .with("search", || Arc::new(SearchModule))
        .with("trading-desk", || Arc::new(TradingDeskModule))
        .with("course-catalog", || Arc::new(CourseCatalogModule))
        .with("payroll", || Arc::new(PayrollModule))
}
