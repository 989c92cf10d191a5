// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! # Fleetop - Fleet Cluster Operator for Kubernetes
//!
//! Fleetop is a Kubernetes operator written in Rust that keeps declarative
//! `RemoteCluster` records synchronized with compute clusters provisioned in
//! an external fleet-management service.
//!
//! ## Overview
//!
//! This library provides the core functionality for the operator, including:
//!
//! - The `RemoteCluster` Custom Resource Definition
//! - Reconciliation logic driving the remote cluster lifecycle
//!   (create, adopt, drift sync, delete)
//! - Per-cluster background status polling with write-on-change semantics
//! - A synthetic event bridge for reconciliations triggered outside the
//!   Kubernetes watch stream
//!
//! ## Modules
//!
//! - [`crd`] - The `RemoteCluster` Custom Resource Definition
//! - [`reconcilers`] - Reconciliation logic and finalizer handling
//! - [`poller`] - Background status pollers and their registry
//! - [`fleet`] - HTTP client for the fleet-management service
//! - [`events`] - Synthetic reconcile event bridge
//! - [`context`] - Shared context handed to reconciliations
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use fleetop::crd::{RemoteCluster, RemoteClusterSpec};
//!
//! let spec = RemoteClusterSpec {
//!     plan_name: "production-m".to_string(),
//!     channel_name: "stable".to_string(),
//!     generation_name: "gen-8".to_string(),
//!     region: "eu-west-1".to_string(),
//!     ..RemoteClusterSpec::default()
//! };
//! let cluster = RemoteCluster::new("payments", spec);
//! ```

pub mod constants;
pub mod context;
pub mod crd;
pub mod events;
pub mod fleet;
pub mod metrics;
pub mod poller;
pub mod reconcilers;
