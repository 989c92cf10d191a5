// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! `RemoteCluster` reconciliation logic.
//!
//! The state machine here has no named states; it is driven entirely by
//! the deletion timestamp, the finalizer set and `spec.clusterId`:
//!
//! 1. Deletion branch: stop the status poller, tear down the remote
//!    cluster (unless already gone), drop the finalizer.
//! 2. Finalizer attach, then continue in the same invocation.
//! 3. Creation: empty `clusterId` and a non-external owner means the
//!    remote cluster does not exist yet; create it and persist the id.
//! 4. Drift sync: the remote definition is the source of truth for
//!    plan/generation/channel/region once a cluster exists; mismatches are
//!    copied back into the local spec in a single write.
//! 5. Poller spawn: idempotent, at most one poller per cluster id.
//!
//! Every step is safe to re-run: the controller delivers events at least
//! once and redelivers on error, so redundant invocations must converge
//! without extra remote calls or writes.

use crate::constants::{FINALIZER_REMOTE_CLUSTER, OWNER_EXTERNAL, READY_NOT_FOUND};
use crate::context::Context;
use crate::crd::{RemoteCluster, RemoteClusterSpec};
use crate::fleet::types::ClusterDefinition;
use crate::poller::PollerParams;
use crate::reconcilers::finalizers::{ensure_finalizer, handle_deletion, FinalizerCleanup};
use crate::reconcilers::retry::retry_api_call;
use anyhow::{Context as AnyhowContext, Result};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remote teardown for a `RemoteCluster` being deleted.
///
/// The poller is stopped first so nothing can write status for a cluster
/// that is about to disappear. The remote delete is skipped when the last
/// observed status already says the cluster is gone, or when no cluster was
/// ever created. A delete failure propagates, which keeps the finalizer in
/// place for a retry.
#[async_trait::async_trait]
impl FinalizerCleanup for RemoteCluster {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let cluster_id = &self.spec.cluster_id;

        if !cluster_id.is_empty() {
            ctx.pollers.stop(cluster_id);
        }

        if !needs_remote_delete(&self.spec, self.status.as_ref().map(|s| s.cluster_status.ready.as_str())) {
            info!(
                cluster = %self.name_any(),
                "No remote cluster to delete, cleanup is a no-op"
            );
            return Ok(());
        }

        let deleted = ctx
            .fleet
            .delete_cluster(cluster_id)
            .await
            .with_context(|| format!("failed to delete remote cluster {cluster_id}"))?;

        if !deleted {
            // 404 from the fleet service: someone else removed it. Still a
            // successful cleanup.
            warn!(
                cluster = %self.name_any(),
                cluster_id = %cluster_id,
                "Remote cluster was already gone during cleanup"
            );
        }

        Ok(())
    }
}

/// Reconciles a `RemoteCluster` resource.
///
/// # Arguments
///
/// * `ctx` - Shared context with the Kubernetes client, fleet client and
///   poller registry
/// * `cluster` - The `RemoteCluster` resource to reconcile
///
/// # Errors
///
/// Every failure from the deletion, creation and drift-sync steps is
/// returned as a retryable error; the controller re-delivers the event
/// with backoff. Nothing partial is ever persisted: `clusterId` is only
/// written after a successful create response, and the finalizer is only
/// removed after a successful (or already-gone) remote delete.
pub async fn reconcile_remotecluster(ctx: Arc<Context>, cluster: RemoteCluster) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    info!("Reconciling RemoteCluster: {}/{}", namespace, name);
    debug!(
        namespace = %namespace,
        name = %name,
        cluster_id = %cluster.spec.cluster_id,
        owner = %cluster.spec.owner,
        "Starting RemoteCluster reconciliation"
    );

    // Deletion branch: cleanup, finalizer removal, nothing else runs.
    if cluster.metadata.deletion_timestamp.is_some() {
        return handle_deletion(&ctx, &cluster, FINALIZER_REMOTE_CLUSTER).await;
    }

    ensure_finalizer(&ctx.client, &cluster, FINALIZER_REMOTE_CLUSTER).await?;

    let api: Api<RemoteCluster> = Api::namespaced(ctx.client.clone(), &namespace);
    let mut spec = cluster.spec.clone();

    // Creation: only when no remote identity exists and the cluster is not
    // externally managed. The id is persisted immediately so a crash after
    // this write can never create a second cluster.
    if needs_remote_create(&spec) {
        info!(
            cluster = %name,
            plan = %spec.plan_name,
            region = %spec.region,
            "Creating remote cluster"
        );

        let cluster_id = ctx
            .fleet
            .create_cluster(
                &name,
                &spec.plan_name,
                &spec.channel_name,
                &spec.generation_name,
                &spec.region,
            )
            .await
            .with_context(|| format!("failed to create remote cluster for {namespace}/{name}"))?;

        spec.cluster_id.clone_from(&cluster_id);
        patch_spec(&api, &name, &spec).await?;

        info!(
            cluster = %name,
            cluster_id = %cluster_id,
            "Assigned remote cluster id"
        );
    }

    if !spec.cluster_id.is_empty() {
        // Drift sync: the remote definition wins for plan, generation,
        // channel and region. All corrections land in one write.
        let remote = ctx
            .fleet
            .get_cluster_by_name(&name)
            .await
            .with_context(|| format!("failed to fetch remote definition for {name}"))?;

        if sync_spec_from_remote(&mut spec, &remote) {
            info!(
                cluster = %name,
                plan = %spec.plan_name,
                generation = %spec.generation_name,
                channel = %spec.channel_name,
                region = %spec.region,
                "Remote definition drifted, updating local record"
            );
            patch_spec(&api, &name, &spec).await?;
        }

        if spec.track {
            let last_status = cluster.status.as_ref().map(|s| s.cluster_status.clone());
            ctx.pollers.ensure_running(PollerParams {
                client: ctx.client.clone(),
                fleet: ctx.fleet.clone(),
                namespace: namespace.clone(),
                name: name.clone(),
                cluster_id: spec.cluster_id.clone(),
                interval: ctx.poll_interval,
                last_status,
            });
        } else {
            debug!(cluster = %name, "Tracking disabled, not starting status poller");
        }
    }

    Ok(())
}

/// Whether a remote create is needed: no identity yet and the lifecycle is
/// not externally managed.
#[must_use]
pub fn needs_remote_create(spec: &RemoteClusterSpec) -> bool {
    spec.cluster_id.is_empty() && spec.owner != OWNER_EXTERNAL
}

/// Whether cleanup must call the remote delete operation.
///
/// `last_ready` is the readiness string from the last persisted status, if
/// any. A status already reporting "Not Found" means the remote cluster is
/// gone and the delete call is skipped.
#[must_use]
pub fn needs_remote_delete(spec: &RemoteClusterSpec, last_ready: Option<&str>) -> bool {
    !spec.cluster_id.is_empty() && last_ready != Some(READY_NOT_FOUND)
}

/// Copy drifted fields from the authoritative remote definition into the
/// local spec. Returns whether anything was modified.
pub fn sync_spec_from_remote(spec: &mut RemoteClusterSpec, remote: &ClusterDefinition) -> bool {
    let mut modified = false;

    if spec.plan_name != remote.plan_name {
        spec.plan_name.clone_from(&remote.plan_name);
        modified = true;
    }
    if spec.generation_name != remote.generation_name {
        spec.generation_name.clone_from(&remote.generation_name);
        modified = true;
    }
    if spec.channel_name != remote.channel_name {
        spec.channel_name.clone_from(&remote.channel_name);
        modified = true;
    }
    if spec.region != remote.region {
        spec.region.clone_from(&remote.region);
        modified = true;
    }

    modified
}

/// Persist the full spec in a single merge patch.
async fn patch_spec(api: &Api<RemoteCluster>, name: &str, spec: &RemoteClusterSpec) -> Result<()> {
    let patch = json!({ "spec": spec });

    retry_api_call(
        || async {
            api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
        },
        "patch RemoteCluster spec",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
#[path = "remotecluster_tests.rs"]
mod remotecluster_tests;
