// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Synthetic reconcile events.
//!
//! Kubernetes only delivers reconcile events when the watched record
//! changes. When something outside the watch stream needs a record
//! re-evaluated (an operator-internal signal, an admin endpoint, a future
//! fleet webhook), a synthetic event is injected here instead of faking a
//! write to the record.
//!
//! The bridge is a plain unbounded channel of [`ObjectRef`]s: the receiving
//! half is merged into the controller's trigger stream at startup, so a
//! synthetic event goes through exactly the same queue, dedup and backoff
//! machinery as a real watch event.

use crate::crd::RemoteCluster;
use crate::metrics;
use anyhow::{Context as AnyhowContext, Result};
use futures::channel::mpsc;
use futures::Stream;
use kube::runtime::reflector::ObjectRef;
use tracing::debug;

/// Injector half of the synthetic event bridge.
///
/// Cheap to clone; every clone feeds the same controller stream.
#[derive(Clone)]
pub struct SyntheticEvents {
    tx: mpsc::UnboundedSender<ObjectRef<RemoteCluster>>,
}

impl SyntheticEvents {
    /// Create the bridge. Returns the injector and the stream to hand to
    /// the controller via `reconcile_on`.
    #[must_use]
    pub fn channel() -> (Self, impl Stream<Item = ObjectRef<RemoteCluster>>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }

    /// Request a reconciliation of one `RemoteCluster` by name.
    ///
    /// Fire-and-forget from the caller's perspective: the event is queued
    /// and the controller picks it up like any watch event.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller side of the bridge has shut down.
    pub fn trigger(&self, name: &str, namespace: &str) -> Result<()> {
        debug!(
            cluster = %name,
            namespace = %namespace,
            "Injecting synthetic reconcile event"
        );

        self.tx
            .unbounded_send(ObjectRef::new(name).within(namespace))
            .context("synthetic event channel is closed")?;

        metrics::record_synthetic_event();
        Ok(())
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
