// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! The finalizer is the invariant that makes teardown safe: a record with a
//! remote counterpart always carries it, and it is only removed after the
//! remote resource has been cleaned up (or is already gone). The Kubernetes
//! API server then erases the record once the finalizer set is empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetop::reconcilers::finalizers::{ensure_finalizer, handle_deletion, FinalizerCleanup};
//!
//! async fn reconcile(ctx: Arc<Context>, cluster: RemoteCluster) -> Result<()> {
//!     if cluster.metadata.deletion_timestamp.is_some() {
//!         return handle_deletion(&ctx, &cluster, FINALIZER).await;
//!     }
//!     ensure_finalizer(&ctx.client, &cluster, FINALIZER).await?;
//!     // Normal reconciliation...
//!     Ok(())
//! }
//! ```

use crate::context::Context;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Trait for resources that require external cleanup before deletion.
///
/// `cleanup` runs while the deletion timestamp is set and the finalizer is
/// still present. If it returns an error the finalizer is NOT removed and
/// deletion stays blocked until a later reconciliation succeeds.
#[async_trait::async_trait]
pub trait FinalizerCleanup: Resource + ResourceExt + Clone {
    /// Tear down whatever this resource owns outside the cluster.
    ///
    /// # Errors
    ///
    /// Must return an error when the external resource could not be
    /// removed; that keeps the finalizer in place for a retry.
    async fn cleanup(&self, ctx: &Context) -> Result<()>;
}

/// Add a finalizer to a resource if not already present.
///
/// Idempotent: calling it when the finalizer is present does nothing and
/// issues no API write.
///
/// # Errors
///
/// Returns an error if the metadata patch fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if resource
        .meta()
        .finalizers
        .as_ref()
        .is_none_or(|f| !f.contains(&finalizer.to_string()))
    {
        info!(
            "Adding finalizer {} to {}/{} {}",
            finalizer,
            namespace,
            name,
            T::kind(&())
        );

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.push(finalizer.to_string());

        let api: Api<T> = Api::namespaced(client.clone(), &namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
    }

    Ok(())
}

/// Remove a finalizer from a resource.
///
/// Idempotent: a missing finalizer is a no-op. Normally called through
/// [`handle_deletion`], which runs cleanup first.
///
/// # Errors
///
/// Returns an error if the metadata patch fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.contains(&finalizer.to_string()))
    {
        info!(
            "Removing finalizer {} from {}/{} {}",
            finalizer,
            namespace,
            name,
            T::kind(&())
        );

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.retain(|f| f != finalizer);

        let api: Api<T> = Api::namespaced(client.clone(), &namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
    }

    Ok(())
}

/// Handle resource deletion: run cleanup, then drop the finalizer.
///
/// Called when the resource has a deletion timestamp. If the finalizer is
/// absent (cleanup already completed in an earlier pass) this is a no-op
/// and the API server is free to erase the record.
///
/// # Errors
///
/// Returns an error if cleanup or the finalizer removal fails; the
/// finalizer then stays on the resource and deletion remains blocked until
/// a subsequent reconciliation succeeds.
pub async fn handle_deletion<T>(ctx: &Context, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    info!("{} {}/{} is being deleted", T::kind(&()), namespace, name);

    if resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.contains(&finalizer.to_string()))
    {
        resource.cleanup(ctx).await?;
        remove_finalizer(&ctx.client, resource, finalizer).await?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
