#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Full bootstrap runs over the baseline module pack.

use serde_json::{Value, json};
use tenantkit::{
    Bootstrap, BootstrapOptions, DetectionSignals, TenantIdentity, TenantRegistry,
};

fn pipeline() -> Bootstrap {
    Bootstrap::new(
        TenantRegistry::builtin(),
        tenantkit_baseline::catalog(),
        tenantkit_baseline::loader(),
        BootstrapOptions::default(),
    )
}

fn base() -> Value {
    json!({
        "collections": [ { "slug": "users", "fields": [ { "name": "email" } ] } ]
    })
}

#[tokio::test]
async fn intellitrade_gets_the_trading_stack() {
    let signals = DetectionSignals::default().with_env("BUSINESS_MODE", "intellitrade");
    let report = pipeline().run(&signals, &base()).await.unwrap();

    assert_eq!(report.detection.identity, TenantIdentity::Intellitrade);
    assert!(!report.load.is_degraded(), "failures: {:?}", report.load.failures);
    let names = report.load.loaded_names();
    assert_eq!(
        names,
        vec!["pages", "media", "accounts", "seo", "contact-forms", "trading-desk"]
    );
    // The tenant's feature flags flow into the trading fragment.
    assert_eq!(report.config["trading_desk"]["live_quotes"], json!(true));
    assert_eq!(
        report.config["server_url"],
        json!("http://intellitrade.localhost:3001")
    );
    assert!(report.validation.is_valid());
}

#[tokio::test]
async fn capacita_gets_courses_and_open_enrollment() {
    let signals = DetectionSignals::default().with_domain("capacita.localhost");
    let report = pipeline().run(&signals, &base()).await.unwrap();

    assert_eq!(report.detection.identity, TenantIdentity::Capacita);
    assert!(!report.load.is_degraded());
    assert!(report.load.loaded_names().contains(&"course-catalog"));
    assert_eq!(report.config["course_catalog"]["open_enrollment"], json!(true));
    assert_eq!(report.config["seo"]["title_suffix"], json!(" | Capacita"));
}

#[tokio::test]
async fn salarium_skips_contact_forms_and_locks_down_security() {
    let signals = DetectionSignals::default().with_port(3005);
    let report = pipeline().run(&signals, &base()).await.unwrap();

    assert_eq!(report.detection.identity, TenantIdentity::Salarium);
    let names = report.load.loaded_names();
    assert!(names.contains(&"payroll"));
    assert!(!names.contains(&"contact-forms"));
    assert_eq!(report.config["security"]["require_two_factor"], json!(true));
    assert_eq!(report.config["security"]["max_login_attempts"], json!(3));
}

#[tokio::test]
async fn search_is_opt_in() {
    let without = pipeline()
        .run(
            &DetectionSignals::default().with_env("BUSINESS_MODE", "capacita"),
            &base(),
        )
        .await
        .unwrap();
    assert!(!without.load.loaded_names().contains(&"search"));

    let with = pipeline()
        .run(
            &DetectionSignals::default()
                .with_env("BUSINESS_MODE", "capacita")
                .with_env("ENABLE_SEARCH", "true"),
            &base(),
        )
        .await
        .unwrap();
    assert!(with.load.loaded_names().contains(&"search"));
    assert_eq!(with.config["search"]["provider"], json!("local"));
}

#[tokio::test]
async fn unresolved_tenant_still_boots_with_core_and_shared() {
    let report = pipeline()
        .run(&DetectionSignals::default(), &base())
        .await
        .unwrap();

    assert_eq!(report.detection.identity, TenantIdentity::Unknown);
    assert_eq!(
        report.load.loaded_names(),
        vec!["pages", "media", "accounts", "seo", "contact-forms"]
    );
    // No tenant record: no server URL beyond the base, no tenant context.
    assert!(report.config.get("server_url").is_none());
    assert!(report.config.get("custom").is_none());
    // The base collections keep the configuration structurally valid
    // except for the missing server URL.
    assert!(!report.validation.is_valid());
    assert!(
        report
            .validation
            .issues
            .iter()
            .any(|i| i.contains("server_url"))
    );
}
