//! Tenant configuration registry.
//!
//! The registry is populated once at startup: built-in defaults, optionally
//! layered with a JSON business-configuration file and `TENANTKIT_*`
//! environment overrides, optionally replaced by caller-supplied entries.
//! After construction it is read-only except for [`TenantRegistry::update`],
//! which replaces a tenant entry wholesale.

use std::collections::BTreeMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};

use crate::identity::TenantIdentity;

/// Registry error for layered loading.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("invalid tenant registry configuration: {source}")]
    Load {
        #[from]
        source: figment::Error,
    },
}

/// Security parameters a tenant applies as defaults during merging.
///
/// Every field is optional: `None` means the tenant expresses no preference
/// and the host configuration value (if any) stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecuritySettings {
    /// Whether logins require a second factor.
    pub require_two_factor: Option<bool>,
    /// Idle session timeout in minutes.
    pub session_timeout_minutes: Option<u32>,
    /// Failed login attempts before lockout.
    pub max_login_attempts: Option<u32>,
}

/// Branding, security and feature-flag settings for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantSettings {
    /// Branding values (colors, logo paths, ...) applied as defaults.
    pub branding: BTreeMap<String, serde_json::Value>,
    /// Security parameters applied as defaults.
    pub security: SecuritySettings,
    /// Feature flags surfaced through the injected tenant context.
    pub features: BTreeMap<String, bool>,
}

/// One tenant's full configuration record.
///
/// Instances are registry data: created at startup, replaced wholesale by
/// [`TenantRegistry::update`], never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantConfiguration {
    /// The identity this record belongs to.
    pub identity: TenantIdentity,
    /// Human-readable name, surfaced through the injected tenant context.
    pub display_name: String,
    /// Domains this tenant serves. The first entry seeds the server URL.
    pub domains: Vec<String>,
    /// Ports this tenant listens on. The first entry seeds the server URL.
    pub ports: Vec<u16>,
    /// Environment variables this tenant declares. Used both for
    /// per-tenant environment detection and as the exported variable map.
    pub environment: BTreeMap<String, String>,
    /// Business modules that always load for this tenant.
    pub required_modules: Vec<String>,
    /// Business modules that load only when toggled on.
    pub optional_modules: Vec<String>,
    /// Shared modules this tenant opts out of.
    pub excluded_shared_modules: Vec<String>,
    /// Branding, security and feature-flag settings.
    pub settings: TenantSettings,
}

impl Default for TenantConfiguration {
    fn default() -> Self {
        Self {
            identity: TenantIdentity::Unknown,
            display_name: String::new(),
            domains: Vec::new(),
            ports: Vec::new(),
            environment: BTreeMap::new(),
            required_modules: Vec::new(),
            optional_modules: Vec::new(),
            excluded_shared_modules: Vec::new(),
            settings: TenantSettings::default(),
        }
    }
}

/// Serialized shape of the registry: built-in defaults, the optional JSON
/// business-configuration file and environment overrides all use it.
///
/// Tenants are keyed by slug so figment deep-merges per tenant: a file that
/// overrides one field of one tenant leaves everything else in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RegistryDocument {
    tenants: BTreeMap<String, TenantConfiguration>,
}

/// In-memory registry of known tenants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantRegistry {
    tenants: BTreeMap<TenantIdentity, TenantConfiguration>,
}

impl TenantRegistry {
    /// Registry with the built-in defaults for every known tenant.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_entries(builtin_tenants())
    }

    /// Builds a registry from explicit entries. Later entries replace
    /// earlier ones with the same identity; `Unknown` entries are dropped.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = TenantConfiguration>) -> Self {
        let mut tenants = BTreeMap::new();
        for entry in entries {
            if !entry.identity.is_known() {
                tracing::warn!(
                    display_name = %entry.display_name,
                    "dropping registry entry without a known identity"
                );
                continue;
            }
            tenants.insert(entry.identity, entry);
        }
        Self { tenants }
    }

    /// Loads the registry with layered sources: built-in defaults, then
    /// the JSON business-configuration file (when given), then
    /// `TENANTKIT_REGISTRY_*` environment overrides (nested fields
    /// separated by `__`).
    ///
    /// # Errors
    /// Returns [`RegistryError::Load`] when a layer cannot be read or the
    /// merged document does not deserialize.
    pub fn load(file: Option<&Path>) -> Result<Self, RegistryError> {
        let defaults = RegistryDocument {
            tenants: builtin_tenants()
                .into_iter()
                .map(|t| (t.identity.as_str().to_owned(), t))
                .collect(),
        };
        let mut figment = Figment::from(Serialized::defaults(defaults));
        if let Some(path) = file {
            figment = figment.merge(Json::file(path));
        }
        let doc: RegistryDocument = figment
            .merge(Env::prefixed("TENANTKIT_REGISTRY_").split("__"))
            .extract()?;
        Ok(Self::from_entries(doc.tenants.into_values()))
    }

    /// Applies caller-supplied overrides, replacing matching entries
    /// wholesale.
    #[must_use]
    pub fn with_overrides(
        mut self,
        overrides: impl IntoIterator<Item = TenantConfiguration>,
    ) -> Self {
        for entry in overrides {
            self.update(entry);
        }
        self
    }

    /// Looks up the configuration for an identity.
    #[must_use]
    pub fn get(&self, identity: TenantIdentity) -> Option<&TenantConfiguration> {
        self.tenants.get(&identity)
    }

    /// Replaces a tenant entry wholesale. Entries without a known identity
    /// are rejected with a warning.
    pub fn update(&mut self, config: TenantConfiguration) {
        if !config.identity.is_known() {
            tracing::warn!(
                display_name = %config.display_name,
                "ignoring registry update without a known identity"
            );
            return;
        }
        self.tenants.insert(config.identity, config);
    }

    /// Iterates entries in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &TenantConfiguration> {
        self.tenants.values()
    }

    /// Number of registered tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Returns `true` when no tenants are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

fn builtin_tenants() -> Vec<TenantConfiguration> {
    vec![
        TenantConfiguration {
            identity: TenantIdentity::Intellitrade,
            display_name: "IntelliTrade".to_owned(),
            domains: vec![
                "intellitrade.localhost".to_owned(),
                "intellitrade.com".to_owned(),
            ],
            ports: vec![3001],
            environment: BTreeMap::from([
                ("TENANT_NAME".to_owned(), "intellitrade".to_owned()),
                ("TENANT_SECTOR".to_owned(), "trading".to_owned()),
            ]),
            required_modules: vec!["trading-desk".to_owned()],
            optional_modules: vec!["search".to_owned()],
            excluded_shared_modules: Vec::new(),
            settings: TenantSettings {
                branding: BTreeMap::from([
                    ("primary_color".to_owned(), serde_json::json!("#0f62fe")),
                    (
                        "logo".to_owned(),
                        serde_json::json!("/assets/intellitrade.svg"),
                    ),
                ]),
                security: SecuritySettings {
                    require_two_factor: Some(true),
                    session_timeout_minutes: Some(30),
                    max_login_attempts: Some(5),
                },
                features: BTreeMap::from([
                    ("live_quotes".to_owned(), true),
                    ("paper_trading".to_owned(), true),
                ]),
            },
        },
        TenantConfiguration {
            identity: TenantIdentity::Capacita,
            display_name: "Capacita".to_owned(),
            domains: vec!["capacita.localhost".to_owned(), "capacita.edu".to_owned()],
            ports: vec![3002],
            environment: BTreeMap::from([
                ("TENANT_NAME".to_owned(), "capacita".to_owned()),
                ("TENANT_SECTOR".to_owned(), "training".to_owned()),
            ]),
            required_modules: vec!["course-catalog".to_owned()],
            optional_modules: Vec::new(),
            excluded_shared_modules: Vec::new(),
            settings: TenantSettings {
                branding: BTreeMap::from([
                    ("primary_color".to_owned(), serde_json::json!("#198038")),
                    ("logo".to_owned(), serde_json::json!("/assets/capacita.svg")),
                ]),
                security: SecuritySettings {
                    require_two_factor: Some(false),
                    session_timeout_minutes: Some(60),
                    max_login_attempts: Some(10),
                },
                features: BTreeMap::from([("open_enrollment".to_owned(), true)]),
            },
        },
        TenantConfiguration {
            identity: TenantIdentity::Salarium,
            display_name: "Salarium".to_owned(),
            domains: vec!["salarium.localhost".to_owned(), "salarium.com".to_owned()],
            ports: vec![3005],
            environment: BTreeMap::from([
                ("TENANT_NAME".to_owned(), "salarium".to_owned()),
                ("TENANT_SECTOR".to_owned(), "payroll".to_owned()),
            ]),
            required_modules: vec!["payroll".to_owned()],
            optional_modules: Vec::new(),
            // A payroll back office has no public contact surface.
            excluded_shared_modules: vec!["contact-forms".to_owned()],
            settings: TenantSettings {
                branding: BTreeMap::from([
                    ("primary_color".to_owned(), serde_json::json!("#8a3ffc")),
                    ("logo".to_owned(), serde_json::json!("/assets/salarium.svg")),
                ]),
                security: SecuritySettings {
                    require_two_factor: Some(true),
                    session_timeout_minutes: Some(15),
                    max_login_attempts: Some(3),
                },
                features: BTreeMap::from([("payslip_export".to_owned(), true)]),
            },
        },
    ]
}
