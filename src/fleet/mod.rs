// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! HTTP client for the external fleet-management service.
//!
//! The [`FleetClient`] covers the four operations the operator needs:
//! create a cluster, fetch its status by id, fetch its authoritative
//! definition by name, and delete it. Calls are bounded by a request
//! timeout and retried with exponential backoff on transient failures
//! (HTTP 429/5xx, network errors); other 4xx responses fail fast.
//!
//! The client is injected into the reconciler and the status pollers as an
//! explicit dependency, never referenced as global state.

pub mod types;

use crate::metrics;
use crate::reconcilers::retry::{fleet_backoff, is_retryable_http_status};
use anyhow::{Context as AnyhowContext, Result};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use types::{ClusterDefinition, ClusterStatus, CreateClusterRequest, CreateClusterResponse};
use url::Url;

use crate::constants::READY_NOT_FOUND;

/// HTTP error carrying the response status code.
///
/// The status code is needed by the retry loop (retryable vs. permanent)
/// and by callers that map 404 to domain semantics ("already gone").
#[derive(Debug)]
pub struct FleetApiError {
    pub status: StatusCode,
    pub message: String,
}

impl std::fmt::Display for FleetApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fleet API returned HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for FleetApiError {}

/// Client for the fleet-management REST API.
#[derive(Clone)]
pub struct FleetClient {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl FleetClient {
    /// Create a client for the service at `base_url`.
    ///
    /// `timeout` bounds every request (connect + response); `token`, when
    /// present, is sent as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL or the
    /// underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid fleet API base URL: {base_url}"))?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build fleet HTTP client")?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Create a remote cluster and return its id.
    ///
    /// # Errors
    ///
    /// Returns a retryable error if the service rejects or fails the
    /// request; no partial identity is ever returned.
    pub async fn create_cluster(
        &self,
        name: &str,
        plan_name: &str,
        channel_name: &str,
        generation_name: &str,
        region: &str,
    ) -> Result<String> {
        let body = CreateClusterRequest {
            name: name.to_string(),
            plan_name: plan_name.to_string(),
            channel_name: channel_name.to_string(),
            generation_name: generation_name.to_string(),
            region: region.to_string(),
        };

        let url = self.endpoint("api/v1/clusters");
        let response = self
            .request("POST", &url, Some(&body), "create_cluster")
            .await?;

        let created: CreateClusterResponse = serde_json::from_str(&response)
            .context("failed to parse create-cluster response")?;

        info!(
            cluster = name,
            cluster_id = %created.cluster_id,
            "Created cluster in fleet service"
        );

        Ok(created.cluster_id)
    }

    /// Fetch the current status of a cluster by id.
    ///
    /// A 404 is not an error: it maps to a snapshot with `ready` set to
    /// `"Not Found"`, which is what the cleanup path keys off.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-404 failure after retries.
    pub async fn get_cluster_status(&self, cluster_id: &str) -> Result<ClusterStatus> {
        let url = self.endpoint(&format!("api/v1/clusters/{cluster_id}/status"));

        match self
            .request::<()>("GET", &url, None, "get_cluster_status")
            .await
        {
            Ok(response) => {
                serde_json::from_str(&response).context("failed to parse cluster status response")
            }
            Err(e) if is_not_found(&e) => {
                debug!(cluster_id, "Cluster not found in fleet service");
                Ok(ClusterStatus {
                    ready: READY_NOT_FOUND.to_string(),
                    ..ClusterStatus::default()
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the authoritative cluster definition by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unknown to the service or the
    /// request fails after retries.
    pub async fn get_cluster_by_name(&self, name: &str) -> Result<ClusterDefinition> {
        let url = self.endpoint(&format!("api/v1/clusters/by-name/{name}"));
        let response = self
            .request::<()>("GET", &url, None, "get_cluster_by_name")
            .await?;

        serde_json::from_str(&response).context("failed to parse cluster definition response")
    }

    /// Delete a remote cluster by id.
    ///
    /// Returns `Ok(true)` when the service deleted the cluster and
    /// `Ok(false)` when it was already gone (404) - both count as
    /// successful cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error on any other failure; the caller must keep the
    /// finalizer in place in that case.
    pub async fn delete_cluster(&self, cluster_id: &str) -> Result<bool> {
        let url = self.endpoint(&format!("api/v1/clusters/{cluster_id}"));

        match self
            .request::<()>("DELETE", &url, None, "delete_cluster")
            .await
        {
            Ok(_) => {
                info!(cluster_id, "Deleted cluster in fleet service");
                Ok(true)
            }
            Err(e) if is_not_found(&e) => {
                info!(cluster_id, "Cluster already gone in fleet service");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Execute a fleet API request with automatic retry.
    ///
    /// Retries on HTTP 429/5xx and network errors with the fleet backoff
    /// schedule; fails immediately on other 4xx responses.
    async fn request<T: Serialize + std::fmt::Debug>(
        &self,
        method: &str,
        url: &str,
        body: Option<&T>,
        operation: &str,
    ) -> Result<String> {
        let mut backoff = fleet_backoff();
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.request_once(method, url, body).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(
                            operation,
                            attempt,
                            elapsed = ?start_time.elapsed(),
                            "Fleet API call succeeded after retries"
                        );
                    }
                    metrics::record_fleet_api_request(operation, "success");
                    return Ok(response);
                }
                Err(e) => {
                    let retryable = match e.downcast_ref::<FleetApiError>() {
                        Some(api_err) => is_retryable_http_status(api_err.status),
                        // Anything that never produced a response (connect
                        // failure, timeout) is worth retrying.
                        None => true,
                    };

                    if !retryable {
                        error!(
                            operation,
                            url,
                            error = %e,
                            "Non-retryable fleet API error, failing immediately"
                        );
                        metrics::record_fleet_api_request(operation, "error");
                        return Err(e);
                    }

                    if let Some(duration) = backoff.next_backoff() {
                        warn!(
                            operation,
                            url,
                            attempt,
                            retry_after = ?duration,
                            error = %e,
                            "Retryable fleet API error, will retry"
                        );
                        tokio::time::sleep(duration).await;
                    } else {
                        error!(
                            operation,
                            url,
                            attempt,
                            elapsed = ?start_time.elapsed(),
                            error = %e,
                            "Fleet API retry budget exhausted, giving up"
                        );
                        metrics::record_fleet_api_request(operation, "error");
                        return Err(anyhow::anyhow!(
                            "fleet API retry budget exhausted after {attempt} attempts: {e}"
                        ));
                    }
                }
            }
        }
    }

    /// Single fleet API request without retry.
    async fn request_once<T: Serialize + std::fmt::Debug>(
        &self,
        method: &str,
        url: &str,
        body: Option<&T>,
    ) -> Result<String> {
        debug!(method, url, body = ?body, "Fleet API request");

        let mut request = match method {
            "POST" => {
                let mut req = self.http.post(url);
                if let Some(body_data) = body {
                    req = req.json(body_data);
                }
                req
            }
            "DELETE" => self.http.delete(url),
            _ => self.http.get(url),
        };

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to send {method} {url}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {url}"))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(FleetApiError {
                status,
                message: text,
            }
            .into())
        }
    }
}

/// Check whether an error chain bottoms out in a fleet 404.
fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<FleetApiError>()
        .is_some_and(|e| e.status == StatusCode::NOT_FOUND)
}
