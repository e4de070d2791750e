//! # Sample CRD
//!
//! The resource served by the bundled `dispatch-controller` binary.

use serde::{Deserialize, Serialize};

/// Sample Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: dispatch.example.io/v1
/// kind: Sample
/// metadata:
///   name: my-sample
///   namespace: default
/// spec:
///   value: hello
/// ```
#[derive(kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Sample",
    group = "dispatch.example.io",
    version = "v1",
    namespaced,
    status = "crate::crd::SampleStatus",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SampleSpec {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SampleStatus {
    #[serde(default)]
    pub state: Option<SampleState>,
    /// Generation the status was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum SampleState {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "ERROR")]
    Error,
}
