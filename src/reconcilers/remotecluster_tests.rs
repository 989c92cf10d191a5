// Copyright (c) 2025 Opsforge Maintainers
// SPDX-License-Identifier: MIT

//! Unit tests for `remotecluster.rs`
//!
//! The pure decision helpers are tested directly; the full reconcile path
//! runs against a wiremock fleet service and a hand-driven `tower_test`
//! mock in place of the Kubernetes API.

#[cfg(test)]
mod tests {
    use super::super::{
        needs_remote_create, needs_remote_delete, reconcile_remotecluster, sync_spec_from_remote,
    };
    use crate::constants::{FINALIZER_REMOTE_CLUSTER, OWNER_EXTERNAL, READY_NOT_FOUND};
    use crate::context::Context;
    use crate::crd::{RemoteCluster, RemoteClusterSpec, RemoteClusterStatus};
    use crate::fleet::types::{ClusterDefinition, ClusterStatus};
    use crate::fleet::FleetClient;
    use http_body_util::BodyExt;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::client::Body;
    use kube::Client;
    use std::sync::Arc;
    use std::time::Duration;
    use tower_test::mock::Handle;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_NAMESPACE: &str = "test-namespace";
    const TEST_NAME: &str = "test-cluster";

    type KubeHandle = Handle<http::Request<Body>, http::Response<Body>>;

    fn mock_kube_client() -> (Client, KubeHandle) {
        let (service, handle) = tower_test::mock::pair();
        (Client::new(service, TEST_NAMESPACE), handle)
    }

    fn json_response(body: &serde_json::Value) -> http::Response<Body> {
        http::Response::builder()
            .status(200)
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn request_body_json(request: http::Request<Body>) -> serde_json::Value {
        let bytes = request.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn spec(cluster_id: &str, owner: &str) -> RemoteClusterSpec {
        RemoteClusterSpec {
            owner: owner.to_string(),
            track: true,
            cluster_id: cluster_id.to_string(),
            region: "eu-west-1".to_string(),
            channel_name: "stable".to_string(),
            generation_name: "gen-8".to_string(),
            plan_name: "production-m".to_string(),
        }
    }

    fn remote() -> ClusterDefinition {
        ClusterDefinition {
            plan_name: "production-m".to_string(),
            generation_name: "gen-8".to_string(),
            channel_name: "stable".to_string(),
            region: "eu-west-1".to_string(),
        }
    }

    /// Test that a fresh record with no id needs a remote create
    #[test]
    fn test_needs_create_without_id() {
        assert!(needs_remote_create(&spec("", "")));
        assert!(needs_remote_create(&spec("", "team-payments")));
    }

    /// Test that an existing id suppresses creation
    #[test]
    fn test_no_create_with_id() {
        assert!(!needs_remote_create(&spec("c-42", "")));
    }

    /// Test that externally owned clusters are never created
    #[test]
    fn test_no_create_for_external_owner() {
        assert!(!needs_remote_create(&spec("", OWNER_EXTERNAL)));
        assert!(!needs_remote_create(&spec("c-42", OWNER_EXTERNAL)));
    }

    /// Test that deletion reaches the fleet service when a cluster exists
    #[test]
    fn test_needs_delete_with_id() {
        assert!(needs_remote_delete(&spec("c-42", ""), None));
        assert!(needs_remote_delete(&spec("c-42", ""), Some("Healthy")));
        assert!(needs_remote_delete(&spec("c-42", ""), Some("Unhealthy")));
    }

    /// Test that deletion skips the fleet call when there is no cluster id
    #[test]
    fn test_no_delete_without_id() {
        assert!(!needs_remote_delete(&spec("", ""), None));
        assert!(!needs_remote_delete(&spec("", ""), Some("Healthy")));
    }

    /// Test that deletion skips the fleet call when status already reports
    /// the cluster gone
    #[test]
    fn test_no_delete_when_already_gone() {
        assert!(!needs_remote_delete(
            &spec("c-42", ""),
            Some(READY_NOT_FOUND)
        ));
    }

    /// Test that a matching remote definition causes no modification
    #[test]
    fn test_sync_no_drift() {
        let mut s = spec("c-42", "");
        let before = s.clone();

        assert!(!sync_spec_from_remote(&mut s, &remote()));
        assert_eq!(s, before);
    }

    /// Test that a single drifted field is corrected and reported
    #[test]
    fn test_sync_single_field_drift() {
        let mut s = spec("c-42", "");
        let drifted = ClusterDefinition {
            plan_name: "production-l".to_string(),
            ..remote()
        };

        assert!(sync_spec_from_remote(&mut s, &drifted));
        assert_eq!(s.plan_name, "production-l");
        assert_eq!(s.generation_name, "gen-8", "untouched fields keep their value");
    }

    /// Test that all four governed fields are synced in one pass
    #[test]
    fn test_sync_all_fields_drift() {
        let mut s = spec("c-42", "");
        let drifted = ClusterDefinition {
            plan_name: "production-l".to_string(),
            generation_name: "gen-9".to_string(),
            channel_name: "edge".to_string(),
            region: "us-east-1".to_string(),
        };

        assert!(sync_spec_from_remote(&mut s, &drifted));
        assert_eq!(s.plan_name, "production-l");
        assert_eq!(s.generation_name, "gen-9");
        assert_eq!(s.channel_name, "edge");
        assert_eq!(s.region, "us-east-1");
    }

    /// Test that sync never touches identity or lifecycle fields
    #[test]
    fn test_sync_leaves_identity_fields_alone() {
        let mut s = spec("c-42", "team-payments");
        let drifted = ClusterDefinition {
            plan_name: "production-l".to_string(),
            ..remote()
        };

        sync_spec_from_remote(&mut s, &drifted);
        assert_eq!(s.cluster_id, "c-42");
        assert_eq!(s.owner, "team-payments");
        assert!(s.track);
    }

    /// Test that sync is idempotent: a second pass reports no change
    #[test]
    fn test_sync_is_idempotent() {
        let mut s = spec("c-42", "");
        let drifted = ClusterDefinition {
            region: "us-east-1".to_string(),
            ..remote()
        };

        assert!(sync_spec_from_remote(&mut s, &drifted));
        assert!(!sync_spec_from_remote(&mut s, &drifted));
    }

    /// Test that deletion semantics do not depend on the owner tag: an
    /// adopted external cluster with an id is torn down like any other
    #[test]
    fn test_adopted_external_cluster_is_still_deleted() {
        assert!(needs_remote_delete(
            &spec("c-42", OWNER_EXTERNAL),
            Some("Healthy")
        ));
    }

    fn test_record(spec: RemoteClusterSpec, finalizers: Option<Vec<String>>) -> RemoteCluster {
        let mut cluster = RemoteCluster::new(TEST_NAME, spec);
        cluster.metadata = ObjectMeta {
            name: Some(TEST_NAME.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            finalizers,
            ..ObjectMeta::default()
        };
        cluster
    }

    fn remote_definition_json() -> serde_json::Value {
        serde_json::json!({
            "planName": "production-m",
            "generationName": "gen-8",
            "channelName": "stable",
            "region": "eu-west-1"
        })
    }

    /// Test the full creation pass: a fresh record ends up with the
    /// finalizer attached, the remote create issued once, the returned id
    /// persisted into the spec, and a poller running for that id
    #[tokio::test]
    async fn test_reconcile_creates_remote_cluster() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/clusters"))
            .and(body_json(serde_json::json!({
                "name": TEST_NAME,
                "planName": "production-m",
                "channelName": "stable",
                "generationName": "gen-8",
                "region": "eu-west-1"
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "clusterId": "abc-123" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/api/v1/clusters/by-name/{TEST_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_definition_json()))
            .expect(1)
            .mount(&server)
            .await;

        // First poll tick of the spawned poller
        Mock::given(method("GET"))
            .and(path("/api/v1/clusters/abc-123/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ready": "Creating" })),
            )
            .mount(&server)
            .await;

        let (client, mut handle) = mock_kube_client();
        let fleet = FleetClient::new(&server.uri(), None, Duration::from_secs(2)).unwrap();
        let ctx = Arc::new(Context::new(client, fleet, Duration::from_secs(3600)));

        let cluster = test_record(spec("", ""), None);

        let reconcile = reconcile_remotecluster(ctx.clone(), cluster);
        let kube_driver = async {
            // First write: finalizer attach
            let (request, send) = handle
                .next_request()
                .await
                .expect("reconcile should patch the finalizer");
            assert_eq!(request.method(), http::Method::PATCH);
            assert!(
                request
                    .uri()
                    .path()
                    .ends_with(&format!("/remoteclusters/{TEST_NAME}")),
                "unexpected path {}",
                request.uri().path()
            );
            let body = request_body_json(request).await;
            assert_eq!(
                body["metadata"]["finalizers"],
                serde_json::json!([FINALIZER_REMOTE_CLUSTER])
            );
            send.send_response(json_response(&serde_json::json!({
                "apiVersion": "fleet.opsforge.io/v1alpha1",
                "kind": "RemoteCluster",
                "metadata": {
                    "name": TEST_NAME,
                    "namespace": TEST_NAMESPACE,
                    "finalizers": [FINALIZER_REMOTE_CLUSTER]
                },
                "spec": {}
            })));

            // Second write: spec patch persisting the assigned cluster id
            let (request, send) = handle
                .next_request()
                .await
                .expect("reconcile should persist the cluster id");
            assert_eq!(request.method(), http::Method::PATCH);
            let body = request_body_json(request).await;
            assert_eq!(body["spec"]["clusterId"], "abc-123");
            assert_eq!(body["spec"]["planName"], "production-m");
            send.send_response(json_response(&serde_json::json!({
                "apiVersion": "fleet.opsforge.io/v1alpha1",
                "kind": "RemoteCluster",
                "metadata": {
                    "name": TEST_NAME,
                    "namespace": TEST_NAMESPACE,
                    "finalizers": [FINALIZER_REMOTE_CLUSTER]
                },
                "spec": body["spec"]
            })));
        };

        let (result, ()) = tokio::join!(reconcile, kube_driver);
        result.expect("reconcile should succeed");

        assert!(
            ctx.pollers.is_running("abc-123"),
            "a poller must be running for the new cluster id"
        );
        ctx.pollers.stop("abc-123");
    }

    /// Test that a converged record reconciles as a no-op: no Kubernetes
    /// writes, no remote create, poller confirmed running
    #[tokio::test]
    async fn test_reconcile_converged_record_writes_nothing() {
        let server = MockServer::start().await;

        // Drift sync finds the remote definition matching the local spec
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/clusters/by-name/{TEST_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_definition_json()))
            .mount(&server)
            .await;

        // Poller ticks see the status the record already carries
        Mock::given(method("GET"))
            .and(path("/api/v1/clusters/c-42/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ready": "Healthy" })),
            )
            .mount(&server)
            .await;

        let (client, mut handle) = mock_kube_client();
        let fleet = FleetClient::new(&server.uri(), None, Duration::from_secs(2)).unwrap();
        let ctx = Arc::new(Context::new(client, fleet, Duration::from_millis(50)));

        let mut cluster = test_record(
            spec("c-42", ""),
            Some(vec![FINALIZER_REMOTE_CLUSTER.to_string()]),
        );
        cluster.status = Some(RemoteClusterStatus {
            cluster_status: ClusterStatus {
                ready: "Healthy".to_string(),
                ..ClusterStatus::default()
            },
        });

        reconcile_remotecluster(ctx.clone(), cluster)
            .await
            .expect("reconcile should succeed");

        assert!(ctx.pollers.is_running("c-42"));

        // Neither the reconcile pass nor the unchanged-status poller ticks
        // may write to the Kubernetes API.
        let write = tokio::time::timeout(Duration::from_millis(300), handle.next_request()).await;
        assert!(write.is_err(), "converged record must produce zero writes");

        ctx.pollers.stop("c-42");
    }

    /// Test that reconciling a record twice creates the remote cluster
    /// only once: the second pass sees the persisted id and skips creation
    #[tokio::test]
    async fn test_reconcile_redelivery_creates_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/api/v1/clusters/by-name/{TEST_NAME}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_definition_json()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/clusters/abc-123/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ready": "Healthy" })),
            )
            .mount(&server)
            .await;

        // The create endpoint must never be hit: the record already
        // carries its id, as after a successful first pass.
        Mock::given(method("POST"))
            .and(path("/api/v1/clusters"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let (client, _handle) = mock_kube_client();
        let fleet = FleetClient::new(&server.uri(), None, Duration::from_secs(2)).unwrap();
        let ctx = Arc::new(Context::new(client, fleet, Duration::from_secs(3600)));

        let mut cluster = test_record(
            spec("abc-123", ""),
            Some(vec![FINALIZER_REMOTE_CLUSTER.to_string()]),
        );
        cluster.status = Some(RemoteClusterStatus {
            cluster_status: ClusterStatus {
                ready: "Healthy".to_string(),
                ..ClusterStatus::default()
            },
        });

        for _ in 0..3 {
            reconcile_remotecluster(ctx.clone(), cluster.clone())
                .await
                .expect("redundant reconciles should converge");
        }

        assert_eq!(ctx.pollers.active_count(), 1, "still exactly one poller");
        ctx.pollers.stop("abc-123");
    }
}
