//! Configuration merging and validation.
//!
//! Merging runs at process boot, where a crash is worse than degraded
//! configuration: the driver never fails. Each merge step is guarded
//! individually, so one failing step is logged and the rest still apply.
//! Environment-variable export is a returned map; the merger itself never
//! touches the process environment.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use url::Url;

use crate::identity::TenantIdentity;
use crate::loader::LoadReport;
use crate::registry::TenantConfiguration;

/// Extensibility point in the host configuration that receives the tenant
/// context record.
pub const EXTENSION_KEY: &str = "custom";

/// Key of the injected tenant context record under [`EXTENSION_KEY`].
pub const TENANT_CONTEXT_KEY: &str = "tenant";

#[derive(thiserror::Error, Debug)]
enum MergeStepError {
    #[error("configuration is not a JSON object")]
    NotAnObject,
    #[error("resolved server URL '{url}' is invalid: {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("extensibility point 'custom' is not a JSON object")]
    ExtensionPointNotObject,
    #[error("'{section}' is present but not a JSON object")]
    SectionNotObject { section: &'static str },
}

/// Result of a merge run: the merged configuration and the tenant's
/// environment-variable map for the caller to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The merged host configuration.
    pub config: Value,
    /// Environment variables the resolved tenant declares. See
    /// [`effective_env_exports`] for the conflict semantics.
    pub env_exports: BTreeMap<String, String>,
}

/// Merges the base host configuration with tenant settings and module
/// fragments. Never fails; the worst case is the base configuration
/// returned unchanged.
///
/// Steps, in order, each guarded individually:
/// 1. server URL from the tenant's first domain and port;
/// 2. module fragments, shallow-merged in load order (later wins);
/// 3. tenant context record under the extensibility point;
/// 4. tenant branding/security defaults (existing base values win);
/// 5. environment-variable export into the returned map.
#[must_use]
pub fn merge(
    base: &Value,
    identity: TenantIdentity,
    tenant: Option<&TenantConfiguration>,
    report: &LoadReport,
) -> MergeOutcome {
    if !base.is_object() {
        tracing::warn!("base configuration is not a JSON object; returning it unchanged");
        return MergeOutcome {
            config: base.clone(),
            env_exports: BTreeMap::new(),
        };
    }

    let mut config = base.clone();

    if let Err(error) = resolve_server_url(&mut config, tenant) {
        tracing::warn!(%error, "server URL resolution skipped");
    }
    if let Err(error) = merge_fragments(&mut config, report) {
        tracing::warn!(%error, "module fragment merge skipped");
    }
    if let Err(error) = inject_tenant_context(&mut config, identity, tenant) {
        tracing::warn!(%error, "tenant context injection skipped");
    }
    if let Err(error) = apply_tenant_defaults(&mut config, tenant) {
        tracing::warn!(%error, "tenant defaults skipped");
    }
    let env_exports = tenant.map_or_else(BTreeMap::new, |t| t.environment.clone());

    MergeOutcome {
        config,
        env_exports,
    }
}

/// Step 1: `server_url` from the tenant's first domain and first port.
/// Domains containing `localhost` get `http`, everything else `https`.
fn resolve_server_url(
    config: &mut Value,
    tenant: Option<&TenantConfiguration>,
) -> Result<(), MergeStepError> {
    let Some(tenant) = tenant else {
        tracing::debug!("no tenant configuration; keeping the base server URL");
        return Ok(());
    };
    let (Some(domain), Some(port)) = (tenant.domains.first(), tenant.ports.first()) else {
        tracing::debug!(
            tenant = %tenant.identity,
            "tenant declares no domain/port pair; keeping the base server URL"
        );
        return Ok(());
    };

    let scheme = if domain.contains("localhost") {
        "http"
    } else {
        "https"
    };
    let server_url = format!("{scheme}://{domain}:{port}");
    Url::parse(&server_url).map_err(|source| MergeStepError::InvalidServerUrl {
        url: server_url.clone(),
        source,
    })?;

    let obj = config.as_object_mut().ok_or(MergeStepError::NotAnObject)?;
    obj.insert("server_url".to_owned(), json!(server_url));
    Ok(())
}

/// Step 2: shallow-merge each loaded module's fragment. Load order
/// determines precedence: later modules overwrite earlier keys.
fn merge_fragments(config: &mut Value, report: &LoadReport) -> Result<(), MergeStepError> {
    let obj = config.as_object_mut().ok_or(MergeStepError::NotAnObject)?;
    for module in &report.loaded {
        let Some(fragment) = module.fragment.as_object() else {
            tracing::warn!(
                module = %module.name,
                "configuration fragment is not a JSON object; skipping"
            );
            continue;
        };
        for (key, value) in fragment {
            obj.insert(key.clone(), value.clone());
        }
    }
    Ok(())
}

/// Step 3: read-only tenant context record under the extensibility point,
/// so downstream consumers can introspect the active tenant without
/// re-running detection.
fn inject_tenant_context(
    config: &mut Value,
    identity: TenantIdentity,
    tenant: Option<&TenantConfiguration>,
) -> Result<(), MergeStepError> {
    let Some(tenant) = tenant.filter(|_| identity.is_known()) else {
        tracing::debug!("identity unresolved; no tenant context injected");
        return Ok(());
    };

    let obj = config.as_object_mut().ok_or(MergeStepError::NotAnObject)?;
    let extension = obj
        .entry(EXTENSION_KEY.to_owned())
        .or_insert_with(|| json!({}));
    let extension = extension
        .as_object_mut()
        .ok_or(MergeStepError::ExtensionPointNotObject)?;
    extension.insert(
        TENANT_CONTEXT_KEY.to_owned(),
        json!({
            "identity": identity.as_str(),
            "display_name": tenant.display_name,
            "features": tenant.settings.features,
        }),
    );
    Ok(())
}

/// Step 4: tenant branding/security settings as defaults. Opposite
/// precedence from step 2: a value already present in the base wins.
fn apply_tenant_defaults(
    config: &mut Value,
    tenant: Option<&TenantConfiguration>,
) -> Result<(), MergeStepError> {
    let Some(tenant) = tenant else {
        return Ok(());
    };
    let obj = config.as_object_mut().ok_or(MergeStepError::NotAnObject)?;

    let security = &tenant.settings.security;
    let security_defaults: [(&str, Option<Value>); 3] = [
        ("require_two_factor", security.require_two_factor.map(Value::from)),
        (
            "session_timeout_minutes",
            security.session_timeout_minutes.map(Value::from),
        ),
        (
            "max_login_attempts",
            security.max_login_attempts.map(Value::from),
        ),
    ];
    if security_defaults.iter().any(|(_, v)| v.is_some()) {
        let section = obj
            .entry("security".to_owned())
            .or_insert_with(|| json!({}));
        let section = section
            .as_object_mut()
            .ok_or(MergeStepError::SectionNotObject { section: "security" })?;
        for (key, value) in security_defaults {
            if let Some(value) = value {
                section.entry(key.to_owned()).or_insert(value);
            }
        }
    }

    if !tenant.settings.branding.is_empty() {
        let section = obj
            .entry("branding".to_owned())
            .or_insert_with(|| json!({}));
        let section = section
            .as_object_mut()
            .ok_or(MergeStepError::SectionNotObject { section: "branding" })?;
        for (key, value) in &tenant.settings.branding {
            section.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    Ok(())
}

/// Filters an export map down to the variables the caller should actually
/// set, given a snapshot of the current environment: keys already present
/// keep their existing values (conflicting values are preserved, identical
/// values need no write).
#[must_use]
pub fn effective_env_exports(
    exports: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut effective = BTreeMap::new();
    for (key, value) in exports {
        match current.get(key) {
            None => {
                effective.insert(key.clone(), value.clone());
            }
            Some(existing) if existing == value => {}
            Some(existing) => {
                tracing::debug!(
                    variable = %key,
                    existing = %existing,
                    "preserving pre-existing environment value"
                );
            }
        }
    }
    effective
}

/// Itemized validation outcome. Valid when no issues were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Human-readable reasons, one per failed check.
    pub issues: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` when every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, issue: String) {
        tracing::warn!(%issue, "configuration validation failed");
        self.issues.push(issue);
    }
}

/// Validates a merged host configuration: a usable server URL and at least
/// one collection, each with a non-empty slug and at least one field.
/// Does not mutate; every failed check is logged and itemized.
#[must_use]
pub fn validate_config(config: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(obj) = config.as_object() else {
        report.push("configuration is not a JSON object".to_owned());
        return report;
    };

    match obj.get("server_url").and_then(Value::as_str) {
        None => report.push("server_url is missing".to_owned()),
        Some("") => report.push("server_url is empty".to_owned()),
        Some(server_url) => {
            if Url::parse(server_url).is_err() {
                report.push(format!("server_url '{server_url}' is not a valid URL"));
            }
        }
    }

    let collections = obj.get("collections").and_then(Value::as_array);
    match collections {
        None => report.push("no collections are registered".to_owned()),
        Some(collections) if collections.is_empty() => {
            report.push("no collections are registered".to_owned());
        }
        Some(collections) => {
            for (index, collection) in collections.iter().enumerate() {
                let Some(collection) = collection.as_object() else {
                    report.push(format!("collection #{index} is not a JSON object"));
                    continue;
                };
                let slug = collection.get("slug").and_then(Value::as_str).unwrap_or("");
                if slug.is_empty() {
                    report.push(format!("collection #{index} has no slug"));
                }
                let has_fields = collection
                    .get("fields")
                    .and_then(Value::as_array)
                    .is_some_and(|fields| !fields.is_empty());
                if !has_fields {
                    let label = if slug.is_empty() {
                        format!("#{index}")
                    } else {
                        format!("'{slug}'")
                    };
                    report.push(format!("collection {label} has no fields"));
                }
            }
        }
    }

    report
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::loader::LoadedModule;
    use crate::registry::TenantRegistry;
    use std::time::Duration;

    fn report_with(fragments: Vec<(&str, Value)>) -> LoadReport {
        LoadReport {
            loaded: fragments
                .into_iter()
                .map(|(name, fragment)| LoadedModule {
                    name: name.to_owned(),
                    fragment,
                    elapsed: Duration::ZERO,
                })
                .collect(),
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn base_config() -> Value {
        json!({
            "collections": [
                { "slug": "users", "fields": [ { "name": "email" } ] }
            ]
        })
    }

    // ==================== server URL ====================

    #[test]
    fn localhost_domain_gets_http() {
        let registry = TenantRegistry::builtin();
        let outcome = merge(
            &base_config(),
            TenantIdentity::Capacita,
            registry.get(TenantIdentity::Capacita),
            &LoadReport::default(),
        );
        assert_eq!(
            outcome.config["server_url"],
            json!("http://capacita.localhost:3002")
        );
    }

    #[test]
    fn public_domain_gets_https() {
        let mut tenant = TenantRegistry::builtin()
            .get(TenantIdentity::Intellitrade)
            .unwrap()
            .clone();
        tenant.domains = vec!["intellitrade.com".to_owned()];
        tenant.ports = vec![443];

        let outcome = merge(
            &base_config(),
            TenantIdentity::Intellitrade,
            Some(&tenant),
            &LoadReport::default(),
        );
        assert_eq!(
            outcome.config["server_url"],
            json!("https://intellitrade.com:443")
        );
    }

    #[test]
    fn missing_domains_keep_base_server_url() {
        let mut tenant = TenantRegistry::builtin()
            .get(TenantIdentity::Capacita)
            .unwrap()
            .clone();
        tenant.domains.clear();

        let mut base = base_config();
        base["server_url"] = json!("https://fallback.example");
        let outcome = merge(
            &base,
            TenantIdentity::Capacita,
            Some(&tenant),
            &LoadReport::default(),
        );
        assert_eq!(outcome.config["server_url"], json!("https://fallback.example"));
    }

    // ==================== fragments ====================

    #[test]
    fn later_fragments_overwrite_earlier_keys() {
        let report = report_with(vec![
            ("first", json!({"theme": "light", "first": true})),
            ("second", json!({"theme": "dark"})),
        ]);
        let outcome = merge(
            &base_config(),
            TenantIdentity::Unknown,
            None,
            &report,
        );
        assert_eq!(outcome.config["theme"], json!("dark"));
        assert_eq!(outcome.config["first"], json!(true));
    }

    #[test]
    fn non_object_fragment_is_skipped() {
        let report = report_with(vec![
            ("broken", json!("not an object")),
            ("fine", json!({"ok": true})),
        ]);
        let outcome = merge(&base_config(), TenantIdentity::Unknown, None, &report);
        assert_eq!(outcome.config["ok"], json!(true));
    }

    // ==================== tenant context ====================

    #[test]
    fn tenant_context_is_injected_under_extension_point() {
        let registry = TenantRegistry::builtin();
        let outcome = merge(
            &base_config(),
            TenantIdentity::Salarium,
            registry.get(TenantIdentity::Salarium),
            &LoadReport::default(),
        );
        let context = &outcome.config[EXTENSION_KEY][TENANT_CONTEXT_KEY];
        assert_eq!(context["identity"], json!("salarium"));
        assert_eq!(context["display_name"], json!("Salarium"));
        assert_eq!(context["features"]["payslip_export"], json!(true));
    }

    #[test]
    fn existing_extension_keys_survive() {
        let registry = TenantRegistry::builtin();
        let mut base = base_config();
        base[EXTENSION_KEY] = json!({"existing": 1});

        let outcome = merge(
            &base,
            TenantIdentity::Capacita,
            registry.get(TenantIdentity::Capacita),
            &LoadReport::default(),
        );
        assert_eq!(outcome.config[EXTENSION_KEY]["existing"], json!(1));
        assert_eq!(
            outcome.config[EXTENSION_KEY][TENANT_CONTEXT_KEY]["identity"],
            json!("capacita")
        );
    }

    #[test]
    fn unknown_identity_injects_no_context() {
        let outcome = merge(
            &base_config(),
            TenantIdentity::Unknown,
            None,
            &LoadReport::default(),
        );
        assert!(outcome.config.get(EXTENSION_KEY).is_none());
    }

    // ==================== tenant defaults ====================

    #[test]
    fn base_security_values_win_over_tenant_defaults() {
        let registry = TenantRegistry::builtin();
        let mut base = base_config();
        base["security"] = json!({"session_timeout_minutes": 120});

        let outcome = merge(
            &base,
            TenantIdentity::Salarium,
            registry.get(TenantIdentity::Salarium),
            &LoadReport::default(),
        );
        // Base value stands; missing keys get the tenant defaults.
        assert_eq!(
            outcome.config["security"]["session_timeout_minutes"],
            json!(120)
        );
        assert_eq!(outcome.config["security"]["require_two_factor"], json!(true));
        assert_eq!(outcome.config["security"]["max_login_attempts"], json!(3));
    }

    #[test]
    fn branding_defaults_fill_missing_keys_only() {
        let registry = TenantRegistry::builtin();
        let mut base = base_config();
        base["branding"] = json!({"primary_color": "#000000"});

        let outcome = merge(
            &base,
            TenantIdentity::Intellitrade,
            registry.get(TenantIdentity::Intellitrade),
            &LoadReport::default(),
        );
        assert_eq!(outcome.config["branding"]["primary_color"], json!("#000000"));
        assert_eq!(
            outcome.config["branding"]["logo"],
            json!("/assets/intellitrade.svg")
        );
    }

    // ==================== env exports ====================

    #[test]
    fn env_exports_come_from_the_tenant() {
        let registry = TenantRegistry::builtin();
        let outcome = merge(
            &base_config(),
            TenantIdentity::Capacita,
            registry.get(TenantIdentity::Capacita),
            &LoadReport::default(),
        );
        assert_eq!(
            outcome.env_exports.get("TENANT_NAME").map(String::as_str),
            Some("capacita")
        );
    }

    #[test]
    fn effective_exports_preserve_conflicting_values() {
        let exports = BTreeMap::from([
            ("TENANT_NAME".to_owned(), "capacita".to_owned()),
            ("TENANT_SECTOR".to_owned(), "training".to_owned()),
            ("FRESH".to_owned(), "yes".to_owned()),
        ]);
        let current = BTreeMap::from([
            // Conflicting: must be preserved, i.e. not exported.
            ("TENANT_NAME".to_owned(), "operator-override".to_owned()),
            // Identical: idempotent, no write needed.
            ("TENANT_SECTOR".to_owned(), "training".to_owned()),
        ]);

        let effective = effective_env_exports(&exports, &current);
        assert_eq!(
            effective,
            BTreeMap::from([("FRESH".to_owned(), "yes".to_owned())])
        );
    }

    // ==================== fail-safe behavior ====================

    #[test]
    fn non_object_base_is_returned_unchanged() {
        let base = json!(["not", "an", "object"]);
        let registry = TenantRegistry::builtin();
        let outcome = merge(
            &base,
            TenantIdentity::Capacita,
            registry.get(TenantIdentity::Capacita),
            &LoadReport::default(),
        );
        assert_eq!(outcome.config, base);
        assert!(outcome.env_exports.is_empty());
    }

    #[test]
    fn merge_is_deterministic() {
        let registry = TenantRegistry::builtin();
        let report = report_with(vec![
            ("alpha", json!({"a": [1, 2, 3]})),
            ("beta", json!({"b": {"nested": true}})),
        ]);

        let first = merge(
            &base_config(),
            TenantIdentity::Intellitrade,
            registry.get(TenantIdentity::Intellitrade),
            &report,
        );
        let second = merge(
            &base_config(),
            TenantIdentity::Intellitrade,
            registry.get(TenantIdentity::Intellitrade),
            &report,
        );
        assert_eq!(
            serde_json::to_string(&first.config).unwrap(),
            serde_json::to_string(&second.config).unwrap()
        );
        assert_eq!(first.env_exports, second.env_exports);
    }

    // ==================== validation ====================

    #[test]
    fn valid_config_passes() {
        let registry = TenantRegistry::builtin();
        let outcome = merge(
            &base_config(),
            TenantIdentity::Capacita,
            registry.get(TenantIdentity::Capacita),
            &LoadReport::default(),
        );
        let report = validate_config(&outcome.config);
        assert!(report.is_valid(), "issues: {:?}", report.issues);
    }

    #[test]
    fn missing_server_url_is_reported() {
        let report = validate_config(&base_config());
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.contains("server_url")));
    }

    #[test]
    fn empty_collections_are_reported() {
        let config = json!({"server_url": "http://localhost:3000", "collections": []});
        let report = validate_config(&config);
        assert_eq!(report.issues, vec!["no collections are registered".to_owned()]);
    }

    #[test]
    fn collection_problems_are_itemized() {
        let config = json!({
            "server_url": "http://localhost:3000",
            "collections": [
                { "slug": "", "fields": [] },
                { "slug": "posts", "fields": [] },
                { "slug": "pages", "fields": [{ "name": "title" }] }
            ]
        });
        let report = validate_config(&config);
        assert_eq!(report.issues.len(), 3);
        assert!(report.issues.iter().any(|i| i.contains("#0 has no slug")));
        assert!(report.issues.iter().any(|i| i.contains("'posts' has no fields")));
    }
}
