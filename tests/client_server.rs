//! Integration tests running the client against the in-memory server
//!
//! Every test binds its own server on an ephemeral localhost port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use ocm_sdk::cli::{self, CreateClusterArgs, ListArgs, WaitCondition};
use ocm_sdk::client::{Connection, Response};
use ocm_sdk::memory::MemoryServer;
use ocm_sdk::model::clusters_mgmt::{Cluster, ClusterState, Event, User, Version};
use ocm_sdk::model::service_logs::{LogEntry, Severity};
use ocm_sdk::model::Resource;
use ocm_sdk::Error;

const INTERVAL: Duration = Duration::from_millis(10);
const TIMEOUT: Duration = Duration::from_secs(5);

/// Serves `server` on a free port and returns a connection to it
async fn start(server: &MemoryServer) -> Connection {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");
    let app = server.router();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Connection::builder()
        .url(format!("http://{}", addr))
        .token("test-token")
        .build()
        .unwrap()
}

async fn add_cluster(conn: &Connection, name: &str) -> Cluster {
    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .add()
        .body(Cluster::new().name(name))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.into_body().unwrap()
}

fn id(cluster: &Cluster) -> String {
    cluster.object_id().unwrap().to_string()
}

#[tokio::test]
async fn test_cluster_install_and_poll() {
    let server = MemoryServer::new();
    let conn = start(&server).await;

    let cluster = add_cluster(&conn, "mycluster").await;
    assert_eq!(cluster.state, Some(ClusterState::Installing));
    assert_eq!(cluster.kind(), "Cluster");
    assert_eq!(cluster.openshift_version.as_deref(), Some("4.15.10"));
    assert!(cluster
        .object_href()
        .unwrap()
        .starts_with("/api/clusters_mgmt/v1/clusters/"));

    let response = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(&id(&cluster))
        .poll()
        .interval(INTERVAL)
        .timeout(TIMEOUT)
        .predicate(|response: &Response<Cluster>| {
            response.body().and_then(|c| c.state) == Some(ClusterState::Ready)
        })
        .start()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let ready = response.into_body().unwrap();
    assert_eq!(ready.status.and_then(|s| s.dns_ready), Some(true));
}

#[tokio::test]
async fn test_list_paging_and_order() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    for name in ["alpha", "bravo", "charlie"] {
        add_cluster(&conn, name).await;
    }
    let clusters = conn.clusters_mgmt().v1().clusters();

    let page = clusters.list().page(2).size(2).send().await.unwrap();
    assert_eq!(page.page(), 2);
    assert_eq!(page.size(), 1);
    assert_eq!(page.total(), 3);
    assert_eq!(page.items()[0].name.as_deref(), Some("charlie"));

    let page = clusters.list().order("name desc").send().await.unwrap();
    let names: Vec<_> = page
        .into_items()
        .into_iter()
        .map(|c| c.name.unwrap())
        .collect();
    assert_eq!(names, vec!["charlie", "bravo", "alpha"]);

    let page = clusters
        .list()
        .search("name = 'bravo' and state = 'ready'")
        .send()
        .await
        .unwrap();
    assert_eq!(page.total(), 1);

    let result = clusters.list().search("color = 'blue'").send().await;
    match result {
        Err(Error::Api(e)) => {
            assert_eq!(e.status, 400);
            assert_eq!(e.code.as_deref(), Some("CLUSTERS-MGMT-400"));
        }
        other => panic!("Expected API error, got {:?}", other.map(|p| p.total())),
    }
}

#[tokio::test]
async fn test_update_sends_only_set_fields() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "mycluster").await;
    let client = conn.clusters_mgmt().v1().clusters().cluster(&id(&cluster));

    let updated = client
        .update()
        .body(Cluster::new().display_name("My cluster"))
        .send()
        .await
        .unwrap()
        .into_body()
        .unwrap();

    assert_eq!(updated.display_name.as_deref(), Some("My cluster"));
    assert_eq!(updated.name.as_deref(), Some("mycluster"));
    assert_eq!(updated.multi_az, Some(false));
    assert_eq!(updated.state, Some(ClusterState::Ready));
}

#[tokio::test]
async fn test_add_with_unknown_version_is_rejected() {
    let server = MemoryServer::new();
    let conn = start(&server).await;

    let result = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .add()
        .body(
            Cluster::new()
                .name("mycluster")
                .version(Version::link_to("openshift-v3.11")),
        )
        .send()
        .await;

    let error = result.err().unwrap();
    assert_eq!(error.status(), Some(400));
    match error {
        Error::Api(e) => assert!(e.reason().contains("openshift-v3.11")),
        other => panic!("Expected API error, got {}", other),
    }
    assert_eq!(server.cluster_count(), 0);
}

#[tokio::test]
async fn test_hibernate_and_resume() {
    let server = MemoryServer::new();
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "sleepy").await;
    let client = conn.clusters_mgmt().v1().clusters().cluster(&id(&cluster));

    // still installing
    let error = client.hibernate().send().await.err().unwrap();
    match error {
        Error::Api(e) => {
            assert_eq!(e.status, 400);
            assert_eq!(e.kind, "Error");
            assert!(e.reason().contains("installing"));
        }
        other => panic!("Expected API error, got {}", other),
    }

    client
        .poll()
        .interval(INTERVAL)
        .timeout(TIMEOUT)
        .predicate(|r: &Response<Cluster>| {
            r.body().and_then(|c| c.state) == Some(ClusterState::Ready)
        })
        .start()
        .await
        .unwrap();

    assert_eq!(client.hibernate().send().await.unwrap().status(), 200);
    let cluster = client.get().send().await.unwrap().into_body().unwrap();
    assert_eq!(cluster.state, Some(ClusterState::Hibernating));

    client.resume().send().await.unwrap();
    let cluster = client.get().send().await.unwrap().into_body().unwrap();
    assert_eq!(cluster.state, Some(ClusterState::Ready));
}

#[tokio::test]
async fn test_delete_and_poll_for_not_found() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "doomed").await;
    let cluster_id = id(&cluster);
    let client = conn.clusters_mgmt().v1().clusters().cluster(&cluster_id);

    let response = client.delete().deprovision(false).send().await.unwrap();
    assert_eq!(response.status(), 204);
    assert!(response.body().is_none());
    assert_eq!(server.cluster_count(), 0);

    let response = client
        .poll()
        .interval(INTERVAL)
        .timeout(TIMEOUT)
        .status(404)
        .start()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert!(response.body().is_none());
    assert_eq!(response.error().unwrap().status, 404);

    let error = client.get().send().await.err().unwrap();
    assert!(error.is_not_found());

    let logs = conn
        .service_logs()
        .v1()
        .cluster_logs()
        .list()
        .search(format!(
            "cluster_id = '{}' and severity = 'Warning'",
            cluster_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(logs.total(), 1);
    assert_eq!(
        logs.items()[0].summary.as_deref(),
        Some("Cluster deleted without deprovisioning")
    );
}

#[tokio::test]
async fn test_poll_timeout_reports_last_status() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "steady").await;

    let result = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(&id(&cluster))
        .poll()
        .interval(Duration::from_millis(20))
        .timeout(Duration::from_millis(100))
        .predicate(|r: &Response<Cluster>| {
            r.body().and_then(|c| c.state) == Some(ClusterState::Hibernating)
        })
        .start()
        .await;

    match result {
        Err(Error::PollTimeout { last_status }) => assert_eq!(last_status, 200),
        Err(other) => panic!("Expected poll timeout, got {}", other),
        Ok(_) => panic!("Expected poll timeout"),
    }
}

#[tokio::test]
async fn test_groups_and_users() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "shared").await;
    let groups = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(&id(&cluster))
        .groups();

    let listed = groups.list().send().await.unwrap();
    let ids: Vec<_> = listed
        .items()
        .iter()
        .map(|g| g.object_id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["dedicated-admins", "cluster-admins"]);

    let users = groups.group("dedicated-admins").users();
    let added = users
        .add()
        .body(User::new().id("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), 201);

    let listed = users.list().send().await.unwrap();
    assert_eq!(listed.total(), 1);
    assert_eq!(listed.items()[0].object_id(), Some("alice"));

    assert_eq!(users.user("alice").delete().send().await.unwrap().status(), 204);
    let error = users.user("alice").get().send().await.err().unwrap();
    assert!(error.is_not_found());

    let error = groups.group("nobody").get().send().await.err().unwrap();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_identifiers_with_reserved_characters() {
    let server = MemoryServer::with_install_steps(0);
    let conn = start(&server).await;
    let cluster = add_cluster(&conn, "escaped").await;
    let users = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster(&id(&cluster))
        .groups()
        .group("dedicated-admins")
        .users();

    for name in ["jane doe", "ops/oncall", "who?#1"] {
        let added = users
            .add()
            .body(User::new().id(name))
            .send()
            .await
            .unwrap();
        assert_eq!(added.status(), 201);

        let user = users.user(name).get().send().await.unwrap().into_body().unwrap();
        assert_eq!(user.object_id(), Some(name));
    }

    let user = users.user("jane doe").get().send().await.unwrap().into_body().unwrap();
    assert!(user.object_href().unwrap().ends_with("/users/jane%20doe"));

    assert_eq!(users.list().send().await.unwrap().total(), 3);
    assert_eq!(
        users.user("ops/oncall").delete().send().await.unwrap().status(),
        204
    );
    assert!(users
        .user("ops/oncall")
        .get()
        .send()
        .await
        .err()
        .unwrap()
        .is_not_found());
}

#[tokio::test]
async fn test_service_log_entries() {
    let server = MemoryServer::new();
    let conn = start(&server).await;
    let logs = conn.service_logs().v1().cluster_logs();

    let entry = logs
        .add()
        .body(
            LogEntry::new()
                .cluster_uuid("c0ffee")
                .service_name("SREManualAction")
                .severity(Severity::Error)
                .summary("Node replaced"),
        )
        .send()
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert!(entry
        .object_href()
        .unwrap()
        .starts_with("/api/service_logs/v1/cluster_logs/"));

    let fetched = logs
        .log_entry(entry.object_id().unwrap())
        .get()
        .send()
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(fetched.severity, Some(Severity::Error));

    let error = logs.add().body(LogEntry::new()).send().await.err().unwrap();
    match error {
        Error::Api(e) => assert_eq!(e.code.as_deref(), Some("SERVICE-LOGS-400")),
        other => panic!("Expected API error, got {}", other),
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = MemoryServer::new();
    let conn = start(&server).await;

    let error = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster("missing")
        .credentials()
        .get()
        .send()
        .await
        .err()
        .unwrap();

    match error {
        Error::Api(e) => {
            assert_eq!(e.status, 404);
            assert_eq!(e.code.as_deref(), Some("CLUSTERS-MGMT-404"));
            assert!(e.reason().contains("/clusters/missing/credentials"));
        }
        other => panic!("Expected API error, got {}", other),
    }
}

#[tokio::test]
async fn test_catalogs() {
    let server = MemoryServer::new();
    let conn = start(&server).await;
    let v1 = conn.clusters_mgmt().v1();

    let versions = v1
        .versions()
        .list()
        .search("channel_group = 'stable'")
        .send()
        .await
        .unwrap();
    assert_eq!(versions.total(), 2);

    let version = v1
        .versions()
        .version("openshift-v4.15.10")
        .get()
        .send()
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(version.default_version, Some(true));

    let addons = v1.addons().list().send().await.unwrap();
    assert_eq!(addons.total(), 3);
}

#[tokio::test]
async fn test_tracked_events_are_kept() {
    let server = MemoryServer::new();
    let conn = start(&server).await;

    let response = conn
        .clusters_mgmt()
        .v1()
        .events()
        .add()
        .body(Event::new().key("cluster-list-viewed"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let events = server.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key.as_deref(), Some("cluster-list-viewed"));
    assert!(events[0].object_href().unwrap().starts_with("/api/clusters_mgmt/v1/events/"));
}

#[tokio::test]
async fn test_cli_commands_against_server() {
    let server = MemoryServer::new();
    let conn = start(&server).await;

    let args = CreateClusterArgs {
        name: "from-cli".to_string(),
        version: None,
        region: Some("eu-west-1".to_string()),
        provider: None,
        multi_az: true,
        compute_nodes: None,
        display_name: None,
    };
    let cluster = cli::create_cluster(&conn, &args).await.unwrap();
    let cluster_id = id(&cluster);
    assert_eq!(cluster.multi_az, Some(true));
    assert_eq!(
        cluster.region.as_ref().and_then(|r| r.object_id()),
        Some("eu-west-1")
    );

    let ready = cli::wait_for_cluster(
        &conn,
        &cluster_id,
        WaitCondition::State(ClusterState::Ready),
        TIMEOUT,
        INTERVAL,
    )
    .await
    .unwrap();
    assert_eq!(ready.unwrap().state, Some(ClusterState::Ready));

    let listed = cli::list_clusters(&conn, &ListArgs::default()).await.unwrap();
    assert_eq!(listed.total(), 1);

    let credentials = cli::get_credentials(&conn, &cluster_id).await.unwrap();
    assert!(credentials.kubeconfig.unwrap().contains("from-cli"));

    let status = cli::delete_cluster(&conn, &cluster_id, true).await.unwrap();
    assert_eq!(status, 204);

    let gone = cli::wait_for_cluster(&conn, &cluster_id, WaitCondition::Deleted, TIMEOUT, INTERVAL)
        .await
        .unwrap();
    assert!(gone.is_none());

    let logs = cli::list_service_logs(&conn, &cluster_id, None, 100)
        .await
        .unwrap();
    let summaries: Vec<_> = logs
        .items()
        .iter()
        .map(|e| e.summary.clone().unwrap())
        .collect();
    assert_eq!(
        summaries,
        vec![
            "Cluster installation started",
            "Cluster installation completed",
            "Cluster deleted"
        ]
    );
}

/// Query string and `X-Trace` headers of every request seen by the echo route
type Seen = Arc<Mutex<Vec<(String, Vec<String>)>>>;

async fn echo(State(seen): State<Seen>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    let traces = headers
        .get_all("x-trace")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    seen.lock()
        .unwrap()
        .push((uri.query().unwrap_or_default().to_string(), traces));
    Json(json!({"kind": "Cluster", "id": "echo"}))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({"kind": "Version", "id": "slow"}))
}

/// Serves the echo and slow routes instead of the in-memory server
async fn start_echo() -> (Connection, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/clusters_mgmt/v1/clusters/{id}", get(echo))
        .route("/api/clusters_mgmt/v1/versions/{id}", get(slow))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let conn = Connection::builder()
        .url(format!("http://{}", addr))
        .build()
        .unwrap();
    (conn, seen)
}

#[tokio::test]
async fn test_parameters_and_headers_reach_server() {
    let (conn, seen) = start_echo().await;
    let request = conn
        .clusters_mgmt()
        .v1()
        .clusters()
        .cluster("echo")
        .get()
        .parameter("fields", "id")
        .parameter("fields", "name")
        .header("X-Trace", "a")
        .header("X-Trace", "b");

    let first = request.send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.body().and_then(|c| c.object_id()), Some("echo"));

    // sending again reuses the same query and headers
    request.send().await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    for (query, traces) in &seen {
        assert_eq!(query, "fields=id&fields=name");
        assert_eq!(traces, &vec!["a".to_string(), "b".to_string()]);
    }
}

#[tokio::test]
async fn test_send_with_timeout_cuts_slow_round_trip() {
    let (conn, _) = start_echo().await;
    let request = conn.clusters_mgmt().v1().versions().version("slow").get();

    let started = std::time::Instant::now();
    let error = request
        .send_with_timeout(Duration::from_millis(100))
        .await
        .err()
        .unwrap();

    assert!(matches!(error, Error::DeadlineExceeded));
    assert!(started.elapsed() < Duration::from_secs(2));
}
