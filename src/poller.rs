// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Background status polling for tracked clusters.
//!
//! One poller task runs per tracked cluster id. Each tick fetches the
//! remote status, compares it structurally against the last persisted
//! snapshot, and writes back through the status subresource only when
//! something changed. Identical fetches produce zero writes, which keeps
//! status polling from flooding the watch stream with no-op events.
//!
//! The [`PollerRegistry`] guarantees at most one concurrently active poller
//! per cluster id: spawning is an atomic check-and-insert under a mutex.
//! Pollers are stopped explicitly when their record is deleted, and shut
//! themselves down when a status write reports that the record is gone.

use crate::crd::RemoteCluster;
use crate::fleet::types::ClusterStatus;
use crate::fleet::FleetClient;
use crate::metrics;
use crate::reconcilers::status::{is_kube_not_found, update_cluster_status};
use kube::{Api, Client};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything a poller task needs, captured at spawn time.
pub struct PollerParams {
    /// Kubernetes client for status write-back
    pub client: Client,
    /// Fleet API client for status fetches
    pub fleet: FleetClient,
    /// Namespace of the owning `RemoteCluster` record
    pub namespace: String,
    /// Name of the owning `RemoteCluster` record
    pub name: String,
    /// Remote cluster id to poll
    pub cluster_id: String,
    /// Tick interval
    pub interval: Duration,
    /// Last persisted status snapshot, if any
    pub last_status: Option<ClusterStatus>,
}

/// Registry of running poller tasks, keyed by cluster id.
///
/// Shared between the reconciler (spawn/stop) and the poller tasks
/// themselves (self-deregistration on exit); all access goes through the
/// inner mutex.
#[derive(Clone, Default)]
pub struct PollerRegistry {
    inner: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl PollerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a poller for `params.cluster_id` unless one is already
    /// running. Returns whether a new poller was spawned.
    ///
    /// The check and the insert happen under one lock acquisition, so two
    /// concurrent calls for the same id can never both spawn.
    pub fn ensure_running(&self, params: PollerParams) -> bool {
        let mut pollers = self.inner.lock().expect("poller registry lock poisoned");

        if let Some(handle) = pollers.get(&params.cluster_id) {
            if !handle.is_finished() {
                debug!(
                    cluster_id = %params.cluster_id,
                    "Status poller already running"
                );
                return false;
            }
        }

        let cluster_id = params.cluster_id.clone();
        info!(
            cluster_id = %cluster_id,
            cluster = %params.name,
            namespace = %params.namespace,
            interval = ?params.interval,
            "Starting status poller"
        );

        let registry = self.clone();
        let task_id = cluster_id.clone();
        let handle = tokio::spawn(async move {
            poll_cluster_status(params).await;
            // Normal exit only happens once the owning record is gone, so
            // removing the entry here cannot race a live replacement.
            registry.deregister(&task_id);
        });

        pollers.insert(cluster_id, handle);
        metrics::set_active_pollers(pollers.len());
        true
    }

    /// Stop and deregister the poller for a cluster id, if one is running.
    /// Returns whether a poller was actually stopped.
    pub fn stop(&self, cluster_id: &str) -> bool {
        let mut pollers = self.inner.lock().expect("poller registry lock poisoned");

        if let Some(handle) = pollers.remove(cluster_id) {
            handle.abort();
            metrics::set_active_pollers(pollers.len());
            info!(cluster_id = %cluster_id, "Stopped status poller");
            true
        } else {
            false
        }
    }

    /// Number of registered pollers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .expect("poller registry lock poisoned")
            .len()
    }

    /// Whether a poller is registered for a cluster id.
    #[must_use]
    pub fn is_running(&self, cluster_id: &str) -> bool {
        self.inner
            .lock()
            .expect("poller registry lock poisoned")
            .contains_key(cluster_id)
    }

    fn deregister(&self, cluster_id: &str) {
        let mut pollers = self.inner.lock().expect("poller registry lock poisoned");
        pollers.remove(cluster_id);
        metrics::set_active_pollers(pollers.len());
        debug!(cluster_id = %cluster_id, "Status poller deregistered");
    }
}

/// The poll loop for one cluster.
///
/// Fetch failures are logged and the tick is skipped; the poller never
/// terminates on transient errors. It exits only when a status write
/// reports 404, meaning the owning record has been erased.
async fn poll_cluster_status(params: PollerParams) {
    let PollerParams {
        client,
        fleet,
        namespace,
        name,
        cluster_id,
        interval,
        mut last_status,
    } = params;

    let api: Api<RemoteCluster> = Api::namespaced(client, &namespace);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let status = match fleet.get_cluster_status(&cluster_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    cluster_id = %cluster_id,
                    cluster = %name,
                    error = %e,
                    "Fetching cluster status failed, skipping tick"
                );
                continue;
            }
        };

        debug!(
            cluster_id = %cluster_id,
            cluster = %name,
            namespace = %namespace,
            ready = %status.ready,
            "Polled cluster status"
        );

        if last_status.as_ref() == Some(&status) {
            continue;
        }

        let ready_before = last_status
            .as_ref()
            .map_or_else(|| "<none>".to_string(), |s| s.ready.clone());

        match update_cluster_status(&api, &name, &status).await {
            Ok(()) => {
                info!(
                    cluster_id = %cluster_id,
                    cluster = %name,
                    ready_before = %ready_before,
                    ready_after = %status.ready,
                    "Cluster status changed"
                );
                metrics::record_status_update();
                last_status = Some(status);
            }
            Err(e) if is_kube_not_found(&e) => {
                info!(
                    cluster_id = %cluster_id,
                    cluster = %name,
                    "Record is gone, stopping status poller"
                );
                return;
            }
            Err(e) => {
                // Conflicts and transient write failures resolve on the
                // next tick; last_status stays unchanged so the write is
                // attempted again.
                warn!(
                    cluster_id = %cluster_id,
                    cluster = %name,
                    error = %e,
                    "Failed to persist cluster status, will retry next tick"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod poller_tests;
