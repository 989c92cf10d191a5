// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Shared context handed to every reconciliation.

use crate::fleet::FleetClient;
use crate::poller::PollerRegistry;
use kube::Client;
use std::time::Duration;

/// Everything a reconciliation needs beyond the resource itself.
///
/// One instance is built at startup and shared via `Arc` across all
/// reconcile invocations and the status pollers they spawn.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes API client
    pub client: Client,
    /// Fleet-management service client
    pub fleet: FleetClient,
    /// Registry of running status pollers, at most one per cluster id
    pub pollers: PollerRegistry,
    /// Tick interval for status pollers
    pub poll_interval: Duration,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, fleet: FleetClient, poll_interval: Duration) -> Self {
        Self {
            client,
            fleet,
            pollers: PollerRegistry::new(),
            poll_interval,
        }
    }
}
