// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions for fleet-managed clusters.
//!
//! This module defines the [`RemoteCluster`] CRD: a namespaced, declarative
//! record of a compute cluster that lives in an external fleet-management
//! service. The spec mirrors the remote cluster's configuration; the status
//! carries the last snapshot the status poller observed remotely.
//!
//! # Lifecycle
//!
//! A `RemoteCluster` moves through these phases, driven entirely by the
//! presence or absence of the finalizer, the deletion timestamp and
//! `spec.clusterId`:
//!
//! 1. finalizer attach
//! 2. remote creation (skipped when `spec.owner` is the external sentinel)
//! 3. drift sync (remote configuration is authoritative once a cluster exists)
//! 4. tracked (status poller running)
//! 5. deletion (remote teardown, then finalizer removal)
//!
//! # Example
//!
//! ```yaml
//! apiVersion: fleet.opsforge.io/v1alpha1
//! kind: RemoteCluster
//! metadata:
//!   name: payments
//!   namespace: prod
//! spec:
//!   planName: production-m
//!   channelName: stable
//!   generationName: gen-8
//!   region: eu-west-1
//!   track: true
//! ```

use crate::fleet::types::ClusterStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a fleet-managed cluster.
///
/// All fields are optional in manifests. `clusterId` is assigned by the
/// operator after a successful remote create and must not be set by users
/// unless adopting a pre-existing cluster (together with
/// `owner: external`). Once non-empty it is never reassigned.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "fleet.opsforge.io",
    version = "v1alpha1",
    kind = "RemoteCluster",
    namespaced,
    status = "RemoteClusterStatus",
    printcolumn = r#"{"name":"STATUS","type":"string","jsonPath":".status.clusterStatus.ready"}"#,
    printcolumn = r#"{"name":"CLUSTER ID","type":"string","jsonPath":".spec.clusterId"}"#,
    printcolumn = r#"{"name":"PLAN","type":"string","jsonPath":".spec.planName"}"#,
    printcolumn = r#"{"name":"CHANNEL","type":"string","jsonPath":".spec.channelName"}"#,
    printcolumn = r#"{"name":"GENERATION","type":"string","jsonPath":".spec.generationName"}"#,
    printcolumn = r#"{"name":"REGION","type":"string","jsonPath":".spec.region"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClusterSpec {
    /// Owner tag. The sentinel value `external` marks clusters created
    /// outside the operator; those are adopted rather than auto-created.
    /// Deleting the record still tears the remote cluster down.
    #[serde(default)]
    pub owner: String,

    /// Whether background status polling should run for this cluster.
    /// Defaults to true; set to false to keep the record without tracking
    /// the remote cluster's state.
    #[serde(default = "default_track")]
    pub track: bool,

    /// Durable identity of the cluster in the fleet service. Empty until
    /// the remote cluster exists.
    #[serde(default)]
    pub cluster_id: String,

    /// Region the cluster is (to be) provisioned in.
    #[serde(default)]
    pub region: String,

    /// Release channel of the cluster software.
    #[serde(default)]
    pub channel_name: String,

    /// Software generation within the channel.
    #[serde(default)]
    pub generation_name: String,

    /// Capacity plan of the cluster.
    #[serde(default)]
    pub plan_name: String,
}

fn default_track() -> bool {
    true
}

/// Observed state of a fleet-managed cluster.
///
/// `clusterStatus` is owned by the status poller: the reconciler never
/// fabricates it, it is only ever overwritten with what the fleet service
/// actually reported.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClusterStatus {
    /// Last-known snapshot of the remote cluster's state.
    #[serde(default)]
    pub cluster_status: ClusterStatus,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
