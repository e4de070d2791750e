//! # Controller Configuration Resolution Tests
//!
//! Verifies how user overrides merge over the framework defaults:
//! - Name derivation and validation
//! - Finalizer derivation, validation and disabling
//! - Retry, rate limiter and interval defaults
//! - Dependent resource configuration and name uniqueness

use dispatch_controller::config::{
    ConfigError, ControllerConfiguration, ControllerOverrides, ControllerRegistry,
    DependentResourceSpec,
};
use dispatch_controller::controller::rate_limiter::LinearRateLimiter;
use dispatch_controller::controller::retry::FibonacciRetry;
use dispatch_controller::crd::{ResourceKey, Sample};
use dispatch_controller::sample::SampleReconciler;
use k8s_openapi::api::core::v1::ConfigMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn resolve(overrides: ControllerOverrides<Sample>) -> Result<ControllerConfiguration<Sample>, ConfigError> {
    ControllerConfiguration::resolve(overrides, "sample-reconciler")
}

#[test]
fn test_defaults() {
    let config = resolve(ControllerOverrides::new()).unwrap();

    assert_eq!(config.name(), "sample-reconciler");
    assert_eq!(config.associated_reconciler_name(), "sample-reconciler");
    assert_eq!(config.resource_type_name(), "samples.dispatch.example.io");
    assert_eq!(config.finalizer(), Some("samples.dispatch.example.io/finalizer"));
    assert!(config.is_generation_aware());
    assert_eq!(config.max_reconciliation_interval(), None);
    assert!(config.watches_all_namespaces());
    assert_eq!(config.label_selector(), None);
    assert_eq!(config.field_manager(), "sample-reconciler");
    assert!(config.filters().is_empty());
    assert!(config.dependents().is_empty());

    let mut execution = config.retry().init_execution();
    assert_eq!(execution.next_delay(), Some(Duration::from_secs(1)));

    let key = ResourceKey::new(Some("default"), "test", None);
    for _ in 0..100 {
        assert_eq!(config.rate_limiter().acquire(&key), None);
    }
}

#[test]
fn test_name_derived_from_reconciler_type() {
    let config =
        ControllerConfiguration::<Sample>::resolve_for::<SampleReconciler>(ControllerOverrides::new())
            .unwrap();
    assert_eq!(config.name(), "samplereconciler");
}

#[test]
fn test_empty_name_falls_back_to_reconciler_name() {
    let config = resolve(ControllerOverrides::new().name("")).unwrap();
    assert_eq!(config.name(), "sample-reconciler");
}

#[test]
fn test_invalid_name_falls_back_to_reconciler_name() {
    let config = resolve(ControllerOverrides::new().name("Not_Valid")).unwrap();
    assert_eq!(config.name(), "sample-reconciler");
    assert_eq!(config.field_manager(), "sample-reconciler");
}

#[test]
fn test_invalid_reconciler_name_is_rejected() {
    assert_eq!(
        ControllerConfiguration::<Sample>::resolve(
            ControllerOverrides::new().name("Not_Valid"),
            "Bad_Reconciler"
        )
        .unwrap_err(),
        ConfigError::InvalidName("Bad_Reconciler".to_string())
    );
}

#[test]
fn test_explicit_finalizer() {
    let config = resolve(ControllerOverrides::new().finalizer("example.io/cleanup")).unwrap();
    assert_eq!(config.finalizer(), Some("example.io/cleanup"));
    assert!(config.uses_finalizer());
}

#[test]
fn test_invalid_finalizer_is_rejected() {
    assert_eq!(
        resolve(ControllerOverrides::new().finalizer("no-slash")).unwrap_err(),
        ConfigError::InvalidFinalizer("no-slash".to_string())
    );
}

#[test]
fn test_empty_finalizer_disables_management() {
    let config = resolve(ControllerOverrides::new().finalizer("")).unwrap();
    assert_eq!(config.finalizer(), None);
    assert!(!config.uses_finalizer());

    let config = resolve(ControllerOverrides::new().disable_finalizer()).unwrap();
    assert_eq!(config.finalizer(), None);
}

#[test]
fn test_core_kind_finalizer_has_no_group() {
    let config =
        ControllerConfiguration::<ConfigMap>::resolve(ControllerOverrides::new(), "cm-reconciler")
            .unwrap();
    assert_eq!(config.finalizer(), Some("configmaps/finalizer"));
}

#[test]
fn test_user_policies_are_kept() {
    let config = resolve(
        ControllerOverrides::new()
            .generation_aware(false)
            .retry(Arc::new(FibonacciRetry::default().with_max_attempts(1)))
            .rate_limiter(Arc::new(LinearRateLimiter::new(Duration::from_secs(60), 1)))
            .max_reconciliation_interval(Duration::from_secs(300))
            .namespaces(["team-a", "team-b"])
            .label_selector("app=sample")
            .field_manager("custom-manager"),
    )
    .unwrap();

    assert!(!config.is_generation_aware());
    assert_eq!(config.retry().init_execution().next_delay(), None);

    let key = ResourceKey::new(Some("team-a"), "test", None);
    assert_eq!(config.rate_limiter().acquire(&key), None);
    assert!(config.rate_limiter().acquire(&key).is_some());

    assert_eq!(config.max_reconciliation_interval(), Some(Duration::from_secs(300)));
    assert!(config.is_watching(Some("team-a")));
    assert!(!config.is_watching(Some("team-c")));
    assert!(config.is_watching(None));
    assert_eq!(config.label_selector(), Some("app=sample"));
    assert_eq!(config.field_manager(), "custom-manager");
}

#[test]
fn test_zero_interval_disables_timer() {
    let config = resolve(ControllerOverrides::new().max_reconciliation_interval(Duration::ZERO)).unwrap();
    assert_eq!(config.max_reconciliation_interval(), None);
}

#[test]
fn test_dependent_configurations() {
    let deployment = DependentResourceSpec::new("deployment", "apps/v1/Deployment");
    let service = DependentResourceSpec::new("service", "v1/Service");

    let config = resolve(
        ControllerOverrides::new()
            .dependent(deployment.clone(), Some(json!({"replicas": 2})))
            .dependent(service.clone(), None),
    )
    .unwrap();

    assert_eq!(config.dependents().len(), 2);
    assert_eq!(config.configuration_for(&deployment), Some(&json!({"replicas": 2})));
    assert_eq!(config.configuration_for(&service), Some(&json!({})));
    assert_eq!(
        config.configuration_for(&DependentResourceSpec::new("missing", "v1/Secret")),
        None
    );
}

#[test]
fn test_duplicate_dependent_is_rejected() {
    let spec = DependentResourceSpec::new("deployment", "apps/v1/Deployment");
    let result = resolve(
        ControllerOverrides::new()
            .dependent(spec.clone(), None)
            .dependent(spec, None),
    );
    assert_eq!(
        result.unwrap_err(),
        ConfigError::DuplicateDependent("deployment".to_string())
    );
}

#[test]
fn test_registry_rejects_duplicate_controller_names() {
    let first = resolve(ControllerOverrides::new()).unwrap();
    let second = resolve(ControllerOverrides::new()).unwrap();

    let mut registry = ControllerRegistry::new();
    registry.register(first.name()).unwrap();
    assert_eq!(
        registry.register(second.name()),
        Err(ConfigError::DuplicateName("sample-reconciler".to_string()))
    );
}
