// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Global constants for the fleetop operator.
//!
//! All numeric and string constants used throughout the codebase, organized
//! by category.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the fleetop CRDs
pub const API_GROUP: &str = "fleet.opsforge.io";

/// API version for the fleetop CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "fleet.opsforge.io/v1alpha1";

/// Kind name for the `RemoteCluster` resource
pub const KIND_REMOTE_CLUSTER: &str = "RemoteCluster";

// ============================================================================
// Lifecycle Constants
// ============================================================================

/// Finalizer blocking `RemoteCluster` deletion until the remote cluster is
/// torn down in the fleet service.
pub const FINALIZER_REMOTE_CLUSTER: &str = "remotecluster.fleet.opsforge.io/finalizer";

/// Sentinel `spec.owner` value marking clusters provisioned outside the
/// operator. Such clusters are adopted, never auto-created; once adopted
/// (non-empty `clusterId`) they go through the same remote teardown on
/// record deletion as operator-created ones.
pub const OWNER_EXTERNAL: &str = "external";

/// Readiness value reported by the fleet service for a cluster that no
/// longer exists. Cleanup skips the remote delete when status already
/// reports this.
pub const READY_NOT_FOUND: &str = "Not Found";

/// Readiness value reported by the fleet service for a fully operational
/// cluster. Used to pick the slow requeue cadence.
pub const READY_HEALTHY: &str = "Healthy";

// ============================================================================
// Timing Constants
// ============================================================================

/// Default interval between status poller ticks, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default request timeout for fleet API calls, in seconds. Kept close to
/// the poll interval so a hung remote call cannot stall a reconciliation
/// for long (see the concurrency model in the docs).
pub const DEFAULT_FLEET_TIMEOUT_SECS: u64 = 5;

/// Requeue interval when the remote cluster is ready, in seconds
pub const REQUEUE_READY_SECS: u64 = 300;

/// Requeue interval when the remote cluster is not (yet) ready, in seconds
pub const REQUEUE_NOT_READY_SECS: u64 = 30;

/// Requeue interval after a reconcile error, in seconds
pub const REQUEUE_ERROR_SECS: u64 = 30;
