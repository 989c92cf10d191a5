// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for fleet-managed clusters.
//!
//! This module contains the reconciler for the `RemoteCluster` resource and
//! the building blocks it is made of.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor `RemoteCluster` changes via the Kubernetes API
//! 2. **Reconcile** - Compare the local record with the remote cluster in
//!    the fleet-management service
//! 3. **Update** - Create or adopt the remote cluster and copy authoritative
//!    remote configuration back into the local spec
//! 4. **Track** - Run a background status poller per cluster that writes
//!    observed state into the status subresource
//!
//! # Submodules
//!
//! - [`remotecluster`] - The `RemoteCluster` state machine
//! - [`finalizers`] - Finalizer attach/remove and the [`finalizers::FinalizerCleanup`] trait
//! - [`status`] - Status subresource write helpers
//! - [`retry`] - Exponential backoff and retry classification

pub mod finalizers;
pub mod remotecluster;
pub mod retry;
pub mod status;

pub use remotecluster::reconcile_remotecluster;
