//! Core content modules: pages, media and accounts.
//!
//! These load for every tenant and contribute their settings under their
//! own configuration key, so no two modules contend for the same top-level
//! entry during the shallow merge.

use async_trait::async_trait;
use serde_json::{Value, json};
use tenantkit::{FeatureModule, LoadCtx};

/// Page tree with drafts and a live-preview path.
#[derive(Debug, Default)]
pub struct PagesModule;

#[async_trait]
impl FeatureModule for PagesModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "pages module ready");
        Ok(())
    }

    fn config_fragment(&self, _ctx: &LoadCtx) -> Value {
        json!({
            "pages": {
                "drafts": true,
                "preview_path": "/preview",
                "home_slug": "home"
            }
        })
    }
}

/// Uploads and derived image sizes.
#[derive(Debug, Default)]
pub struct MediaModule;

#[async_trait]
impl FeatureModule for MediaModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "media module ready");
        Ok(())
    }

    fn config_fragment(&self, _ctx: &LoadCtx) -> Value {
        json!({
            "media": {
                "upload_dir": "media",
                "image_sizes": [
                    { "name": "thumbnail", "width": 320 },
                    { "name": "card", "width": 768 },
                    { "name": "hero", "width": 1600 }
                ]
            }
        })
    }
}

/// Login, registration and e-mail verification.
#[derive(Debug, Default)]
pub struct AccountsModule;

#[async_trait]
impl FeatureModule for AccountsModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        tracing::debug!(tenant = %ctx.identity, "accounts module ready");
        Ok(())
    }

    fn config_fragment(&self, _ctx: &LoadCtx) -> Value {
        json!({
            "accounts": {
                "login_path": "/login",
                "verify_email": true,
                "allow_self_registration": true
            }
        })
    }
}
