// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Status subresource helpers.
//!
//! Status writes go through the status subresource only: they can never
//! touch spec fields or finalizers. The single writer of
//! `status.clusterStatus` is the status poller; the reconciler reads it but
//! never fabricates it.

use crate::crd::RemoteCluster;
use crate::fleet::types::ClusterStatus;
use crate::reconcilers::retry::retry_api_call;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::Api;
use serde_json::json;
use tracing::debug;

/// Write a new cluster status snapshot via a status-only merge patch.
///
/// # Errors
///
/// Returns an error if the patch fails after retries. A 404 (record
/// already erased) is surfaced as a `kube::Error::Api` inside the anyhow
/// chain so the poller can detect it and shut down.
pub async fn update_cluster_status(
    api: &Api<RemoteCluster>,
    name: &str,
    status: &ClusterStatus,
) -> Result<()> {
    let patch = json!({ "status": { "clusterStatus": status } });

    retry_api_call(
        || async {
            api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
        },
        "patch RemoteCluster status",
    )
    .await?;

    debug!(cluster = name, ready = %status.ready, "Persisted cluster status");
    Ok(())
}

/// Check whether an error chain bottoms out in a Kubernetes 404.
///
/// Used by the status poller to tell "record was deleted underneath us"
/// apart from transient write failures.
#[must_use]
pub fn is_kube_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<kube::Error>()
        .is_some_and(|e| matches!(e, kube::Error::Api(api_err) if api_err.code == 404))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
