//! Business modules, one per tenant: trading desk, course catalog and
//! payroll.
//!
//! Selection already filters by supported tenant; the init checks here are
//! the last line of defense when a module is wired into a foreign host by
//! hand.

use async_trait::async_trait;
use serde_json::{Value, json};
use tenantkit::{FeatureModule, LoadCtx, TenantIdentity};

/// IntelliTrade's trading desk.
#[derive(Debug, Default)]
pub struct TradingDeskModule;

#[async_trait]
impl FeatureModule for TradingDeskModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        anyhow::ensure!(
            ctx.identity == TenantIdentity::Intellitrade,
            "trading-desk only supports the intellitrade tenant, got '{}'",
            ctx.identity
        );
        tracing::debug!("trading-desk module ready");
        Ok(())
    }

    fn config_fragment(&self, ctx: &LoadCtx) -> Value {
        json!({
            "trading_desk": {
                "paper_trading": ctx.feature("paper_trading"),
                "live_quotes": ctx.feature("live_quotes"),
                "quote_refresh_seconds": 5
            }
        })
    }
}

/// Capacita's course catalog.
#[derive(Debug, Default)]
pub struct CourseCatalogModule;

#[async_trait]
impl FeatureModule for CourseCatalogModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        anyhow::ensure!(
            ctx.identity == TenantIdentity::Capacita,
            "course-catalog only supports the capacita tenant, got '{}'",
            ctx.identity
        );
        tracing::debug!("course-catalog module ready");
        Ok(())
    }

    fn config_fragment(&self, ctx: &LoadCtx) -> Value {
        json!({
            "course_catalog": {
                "open_enrollment": ctx.feature("open_enrollment"),
                "certificates": true
            }
        })
    }
}

/// Salarium's payroll processing.
#[derive(Debug, Default)]
pub struct PayrollModule;

#[async_trait]
impl FeatureModule for PayrollModule {
    async fn init(&self, ctx: &LoadCtx) -> anyhow::Result<()> {
        anyhow::ensure!(
            ctx.identity == TenantIdentity::Salarium,
            "payroll only supports the salarium tenant, got '{}'",
            ctx.identity
        );
        tracing::debug!("payroll module ready");
        Ok(())
    }

    fn config_fragment(&self, ctx: &LoadCtx) -> Value {
        json!({
            "payroll": {
                "payslip_export": ctx.feature("payslip_export"),
                "pay_cycle": "monthly"
            }
        })
    }
}
