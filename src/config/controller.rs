//! # Controller Configuration
//!
//! Resolves a user's partial configuration over framework defaults into one
//! immutable [`ControllerConfiguration`], built once at startup and read by the
//! dispatcher and the scheduling layer.

use crate::config::dependent::{DependentResourceConfigurations, DependentResourceSpec};
use crate::config::ConfigError;
use crate::constants::{DEFAULT_FINALIZER_SUFFIX, MAX_CONTROLLER_NAME_LEN, MAX_FINALIZER_NAME_LEN};
use crate::controller::filter::EventFilters;
use crate::controller::rate_limiter::{LinearRateLimiter, RateLimiter};
use crate::controller::reconciler::derive_reconciler_name;
use crate::controller::retry::{FibonacciRetry, Retry};
use crate::crd::resource_type_name;
use kube::Resource;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::warn;

const DNS_SUBDOMAIN: &str = r"[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*";

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DNS_SUBDOMAIN}$"))
        .expect("Failed to compile controller name pattern - this should never happen")
});

static FINALIZER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^(?P<prefix>{DNS_SUBDOMAIN})/(?P<name>[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)$"
    ))
    .expect("Failed to compile finalizer pattern - this should never happen")
});

/// Whether `name` can name a controller
pub fn is_valid_controller_name(name: &str) -> bool {
    name.len() <= MAX_CONTROLLER_NAME_LEN && NAME_PATTERN.is_match(name)
}

/// Whether `finalizer` is a domain-qualified finalizer name
pub fn is_valid_finalizer(finalizer: &str) -> bool {
    FINALIZER_PATTERN.captures(finalizer).is_some_and(|captures| {
        let prefix_ok = captures
            .name("prefix")
            .is_some_and(|p| p.as_str().len() <= MAX_CONTROLLER_NAME_LEN);
        let name_ok = captures
            .name("name")
            .is_some_and(|n| n.as_str().len() <= MAX_FINALIZER_NAME_LEN);
        prefix_ok && name_ok
    })
}

/// How the finalizer is chosen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FinalizerOverride {
    /// `<plural>.<group>/finalizer`
    #[default]
    Derived,
    Named(String),
    /// No finalizer management for this controller
    Disabled,
}

/// Partial configuration supplied by the user
///
/// Anything left unset falls back to the framework default on resolution.
pub struct ControllerOverrides<K> {
    name: Option<String>,
    finalizer: FinalizerOverride,
    generation_aware: Option<bool>,
    retry: Option<Arc<dyn Retry>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    max_reconciliation_interval: Option<Duration>,
    namespaces: BTreeSet<String>,
    label_selector: Option<String>,
    field_manager: Option<String>,
    filters: EventFilters<K>,
    dependents: Vec<(DependentResourceSpec, Option<Value>)>,
}

impl<K> Default for ControllerOverrides<K> {
    fn default() -> Self {
        Self {
            name: None,
            finalizer: FinalizerOverride::Derived,
            generation_aware: None,
            retry: None,
            rate_limiter: None,
            max_reconciliation_interval: None,
            namespaces: BTreeSet::new(),
            label_selector: None,
            field_manager: None,
            filters: EventFilters::default(),
            dependents: Vec::new(),
        }
    }
}

impl<K> std::fmt::Debug for ControllerOverrides<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerOverrides")
            .field("name", &self.name)
            .field("finalizer", &self.finalizer)
            .field("generation_aware", &self.generation_aware)
            .field("max_reconciliation_interval", &self.max_reconciliation_interval)
            .field("namespaces", &self.namespaces)
            .field("label_selector", &self.label_selector)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl<K> ControllerOverrides<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use `finalizer`; an empty value disables finalizer management
    #[must_use]
    pub fn finalizer(mut self, finalizer: impl Into<String>) -> Self {
        let finalizer = finalizer.into();
        self.finalizer = if finalizer.is_empty() {
            FinalizerOverride::Disabled
        } else {
            FinalizerOverride::Named(finalizer)
        };
        self
    }

    #[must_use]
    pub fn disable_finalizer(mut self) -> Self {
        self.finalizer = FinalizerOverride::Disabled;
        self
    }

    #[must_use]
    pub fn generation_aware(mut self, generation_aware: bool) -> Self {
        self.generation_aware = Some(generation_aware);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: Arc<dyn Retry>) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Re-reconcile at least this often; zero disables the timer
    #[must_use]
    pub fn max_reconciliation_interval(mut self, interval: Duration) -> Self {
        self.max_reconciliation_interval = Some(interval);
        self
    }

    /// Restrict the controller to these namespaces; none means all namespaces
    #[must_use]
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = Some(field_manager.into());
        self
    }

    #[must_use]
    pub fn on_add_filter(mut self, filter: impl Fn(&K) -> bool + Send + Sync + 'static) -> Self {
        self.filters.on_add = Some(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn on_update_filter(
        mut self,
        filter: impl Fn(&K, &K) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filters.on_update = Some(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn generic_filter(mut self, filter: impl Fn(&K) -> bool + Send + Sync + 'static) -> Self {
        self.filters.generic = Some(Arc::new(filter));
        self
    }

    /// Declare a dependent resource, optionally with its configuration
    #[must_use]
    pub fn dependent(mut self, spec: DependentResourceSpec, configuration: Option<Value>) -> Self {
        self.dependents.push((spec, configuration));
        self
    }
}

/// Resolved, immutable policy of one controller
#[derive(Debug)]
pub struct ControllerConfiguration<K> {
    name: String,
    associated_reconciler_name: String,
    resource_type_name: String,
    finalizer: Option<String>,
    generation_aware: bool,
    retry: Arc<dyn Retry>,
    rate_limiter: Arc<dyn RateLimiter>,
    max_reconciliation_interval: Option<Duration>,
    namespaces: BTreeSet<String>,
    label_selector: Option<String>,
    field_manager: String,
    filters: EventFilters<K>,
    dependents: DependentResourceConfigurations,
}

impl<K: Resource<DynamicType = ()>> ControllerConfiguration<K> {
    /// Resolve `overrides` for a reconciler identified by `reconciler_name`
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the reconciler name is invalid (an
    /// invalid override falls back to it), the finalizer is invalid, or a
    /// dependent resource is declared twice.
    pub fn resolve(
        overrides: ControllerOverrides<K>,
        reconciler_name: &str,
    ) -> Result<Self, ConfigError> {
        let name = match overrides.name {
            Some(name) if is_valid_controller_name(&name) => name,
            Some(name) => {
                if !name.is_empty() {
                    warn!(
                        name = %name,
                        fallback = reconciler_name,
                        "Invalid controller name, using the reconciler name"
                    );
                }
                reconciler_name.to_string()
            }
            None => reconciler_name.to_string(),
        };
        if !is_valid_controller_name(&name) {
            return Err(ConfigError::InvalidName(name));
        }

        let resource_type_name = resource_type_name::<K>();
        let finalizer = match overrides.finalizer {
            FinalizerOverride::Derived => {
                Some(format!("{resource_type_name}/{DEFAULT_FINALIZER_SUFFIX}"))
            }
            FinalizerOverride::Named(finalizer) if is_valid_finalizer(&finalizer) => {
                Some(finalizer)
            }
            FinalizerOverride::Named(finalizer) => {
                return Err(ConfigError::InvalidFinalizer(finalizer))
            }
            FinalizerOverride::Disabled => None,
        };

        let dependents = DependentResourceConfigurations::resolve(overrides.dependents)?;

        Ok(Self {
            field_manager: overrides.field_manager.unwrap_or_else(|| name.clone()),
            name,
            associated_reconciler_name: reconciler_name.to_string(),
            resource_type_name,
            finalizer,
            generation_aware: overrides.generation_aware.unwrap_or(true),
            retry: overrides
                .retry
                .unwrap_or_else(|| Arc::new(FibonacciRetry::default())),
            rate_limiter: overrides
                .rate_limiter
                .unwrap_or_else(|| Arc::new(LinearRateLimiter::deactivated())),
            max_reconciliation_interval: overrides
                .max_reconciliation_interval
                .filter(|interval| !interval.is_zero()),
            namespaces: overrides.namespaces,
            label_selector: overrides.label_selector,
            filters: overrides.filters,
            dependents,
        })
    }

    /// Resolve `overrides`, deriving the default name from the reconciler type `R`
    ///
    /// # Errors
    ///
    /// See [`ControllerConfiguration::resolve`].
    pub fn resolve_for<R: ?Sized>(overrides: ControllerOverrides<K>) -> Result<Self, ConfigError> {
        Self::resolve(overrides, &derive_reconciler_name::<R>())
    }
}

impl<K> ControllerConfiguration<K> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn associated_reconciler_name(&self) -> &str {
        &self.associated_reconciler_name
    }

    /// `<plural>.<group>` of the reconciled kind
    pub fn resource_type_name(&self) -> &str {
        &self.resource_type_name
    }

    /// `None` when finalizer management is disabled
    pub fn finalizer(&self) -> Option<&str> {
        self.finalizer.as_deref()
    }

    pub fn uses_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }

    pub fn is_generation_aware(&self) -> bool {
        self.generation_aware
    }

    pub fn retry(&self) -> &Arc<dyn Retry> {
        &self.retry
    }

    pub fn rate_limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.rate_limiter
    }

    /// `None` disables timer-driven re-reconciliation
    pub fn max_reconciliation_interval(&self) -> Option<Duration> {
        self.max_reconciliation_interval
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    pub fn watches_all_namespaces(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Whether a resource in `namespace` belongs to this controller
    ///
    /// Cluster-scoped resources (`None`) always do.
    pub fn is_watching(&self, namespace: Option<&str>) -> bool {
        match namespace {
            Some(namespace) => self.watches_all_namespaces() || self.namespaces.contains(namespace),
            None => true,
        }
    }

    pub fn label_selector(&self) -> Option<&str> {
        self.label_selector.as_deref()
    }

    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }

    pub fn filters(&self) -> &EventFilters<K> {
        &self.filters
    }

    pub fn dependents(&self) -> &DependentResourceConfigurations {
        &self.dependents
    }

    pub fn configuration_for(&self, spec: &DependentResourceSpec) -> Option<&Value> {
        self.dependents.configuration_for(spec)
    }
}
