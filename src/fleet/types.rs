// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Wire types for the fleet-management API.
//!
//! These types are shared with the CRD status subresource, which is why the
//! status snapshot derives [`JsonSchema`]. Field comparison is structural
//! (`PartialEq`) so the status poller writes back only on real change.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Snapshot of a remote cluster's state as reported by the fleet service.
///
/// `ready` is a free-form readiness string (`"Healthy"`, `"Creating"`,
/// `"Not Found"`, ...); the remaining fields echo the configuration the
/// service currently runs the cluster with.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Readiness indicator reported by the fleet service.
    #[serde(default)]
    pub ready: String,

    /// Plan the cluster currently runs on.
    #[serde(default)]
    pub plan: String,

    /// Region the cluster runs in.
    #[serde(default)]
    pub region: String,

    /// Release channel the cluster follows.
    #[serde(default)]
    pub channel: String,

    /// Software generation the cluster runs.
    #[serde(default)]
    pub generation: String,
}

/// Authoritative definition of a cluster, fetched by name.
///
/// Once a cluster exists remotely these fields are the source of truth for
/// the corresponding spec fields; drift sync copies them into the local
/// record.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Capacity plan name.
    #[serde(default)]
    pub plan_name: String,

    /// Software generation name.
    #[serde(default)]
    pub generation_name: String,

    /// Release channel name.
    #[serde(default)]
    pub channel_name: String,

    /// Region name.
    #[serde(default)]
    pub region: String,
}

/// Request body for cluster creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    pub plan_name: String,
    pub channel_name: String,
    pub generation_name: String,
    pub region: String,
}

/// Response body for cluster creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterResponse {
    /// Durable identity assigned by the fleet service.
    pub cluster_id: String,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
