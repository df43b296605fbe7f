//! Shared modules: SEO, contact forms and search.
//!
//! Shared modules load for every tenant unless the tenant excludes them or
//! an operator toggle disables them. Search ships disabled and is opted
//! into with `ENABLE_SEARCH`.

use async_trait::async_trait;
use serde_json::{Value, json};
use tenantkit::{FeatureModule, LoadCtx};

/// Sitemap generation and meta-tag defaults.
#[derive(Debug, Default)]
pub struct SeoModule;

#[async_trait]
impl FeatureModule for SeoModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "seo module ready");
        Ok(())
    }

    fn config_fragment(&self, ctx: &LoadCtx) -> Value {
        // The tenant's display name seeds the default title suffix.
        let suffix = if ctx.display_name.is_empty() {
            String::new()
        } else {
            format!(" | {}", ctx.display_name)
        };
        json!({
            "seo": {
                "generate_sitemap": true,
                "title_suffix": suffix
            }
        })
    }
}

/// Public contact forms with spam protection.
#[derive(Debug, Default)]
pub struct ContactFormsModule;

#[async_trait]
impl FeatureModule for ContactFormsModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "contact-forms module ready");
        Ok(())
    }

    fn config_fragment(&self, _ctx: &LoadCtx) -> Value {
        json!({
            "contact_forms": {
                "spam_protection": true,
                "store_submissions": true
            }
        })
    }
}

/// Content search over pages. Disabled by default; opt in per deployment.
#[derive(Debug, Default)]
pub struct SearchModule;

#[async_trait]
impl FeatureModule for SearchModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "search module ready");
        Ok(())
    }

    fn config_fragment(&self, _ctx: &LoadCtx) -> Value {
        json!({
            "search": {
                "provider": "local",
                "indexed_keys": ["pages"]
            }
        })
    }
}
