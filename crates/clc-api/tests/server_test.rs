#![allow(clippy::unwrap_used)]
// Integration tests for the `Server` proxy using wiremock.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clc_api::{
    ClcClient, CreateServer, Error, OperationOutcome, Server, ServerType, Session, StorageType,
    TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const ID: &str = "WA1BTDIKRT01";

async fn setup() -> (MockServer, ClcClient) {
    let server = MockServer::start().await;
    let client = ClcClient::from_reqwest(&server.uri(), reqwest::Client::new())
        .unwrap()
        .with_session(Session {
            user_name: "owen".into(),
            account_alias: "BTDI".into(),
            location_alias: Some("WA1".into()),
            roles: vec![],
        });
    (server, client)
}

fn snapshot(name: &str, index: u32) -> Value {
    let base = format!("/v2/servers/BTDI/{ID}/snapshots/{index}");
    json!({
        "name": name,
        "links": [
            { "rel": "self", "href": base },
            { "rel": "delete", "href": base },
            { "rel": "restore", "href": format!("{base}/restore") }
        ]
    })
}

fn document(snapshots: &[Value]) -> Value {
    json!({
        "id": ID.to_lowercase(),
        "name": ID,
        "description": "kitchen sink",
        "groupId": "2a5c0b9662cf4fc8bf6180f139facdc0",
        "locationId": "WA1",
        "osType": "Ubuntu 14 64-bit",
        "status": "active",
        "type": "standard",
        "storageType": "standard",
        "isTemplate": false,
        "details": {
            "powerState": "started",
            "inMaintenanceMode": false,
            "cpu": 2,
            "memoryMB": 4096,
            "storageGB": 17,
            "snapshots": snapshots
        },
        "links": []
    })
}

fn status_link(id: &str) -> Value {
    json!({ "rel": "status", "id": id, "href": format!("/v2/operations/BTDI/status/{id}") })
}

fn queued(id: &str) -> Value {
    json!([{ "server": ID, "isQueued": true, "links": [status_link(id)] }])
}

// ── Loading ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_load_server() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/BTDI/{ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(document(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let s = Server::load(&client, ID, Some("BTDI")).await.unwrap();

    assert_eq!(s.to_string(), ID);
    assert_eq!(s.alias(), "BTDI");
    assert_eq!(s.data().details.memory_mb, Some(4096));
    assert_eq!(s.attribute("powerState").unwrap(), "started");
}

#[tokio::test]
async fn test_load_tolerates_drifted_field_types() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/BTDI/{ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": ID,
            "groupId": null,
            "details": { "cpu": 2.5, "memoryMB": "4096", "powerState": "started" }
        })))
        .mount(&server)
        .await;

    let s = Server::load(&client, ID, Some("BTDI")).await.unwrap();

    assert_eq!(s.to_string(), ID);
    assert_eq!(s.data().details.cpu, None);
    assert_eq!(s.attribute("cpu").unwrap(), 2.5);
    assert_eq!(s.attribute("memoryMB").unwrap(), "4096");
}

#[tokio::test]
async fn test_load_uses_session_alias_by_default() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/BTDI/{ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(document(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let s = Server::load(&client, ID, None).await.unwrap();
    assert_eq!(s.account().alias(), "BTDI");
}

#[tokio::test]
async fn test_load_404_is_server_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v2/servers/BTDI/WA1BTDIKRT99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Resource not found" })),
        )
        .mount(&server)
        .await;

    let result = Server::load(&client, "WA1BTDIKRT99", Some("BTDI")).await;

    match result {
        Err(Error::ServerNotFound { alias, id }) => {
            assert_eq!(alias, "BTDI");
            assert_eq!(id, "WA1BTDIKRT99");
        }
        other => panic!("expected ServerNotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_load_other_failures_propagate() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let result = Server::load(&client, ID, Some("BTDI")).await;

    match result {
        Err(Error::Api { status, message, .. }) => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"), "got: {message}");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_injected_document_never_calls_api() {
    let (server, client) = setup().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let s = Server::from_document(&client, ID, None, document(&[snapshot("a", 1)])).unwrap();
    assert_eq!(s.snapshots(), ["a"]);
    assert_eq!(s.attribute("groupId").unwrap(), "2a5c0b9662cf4fc8bf6180f139facdc0");
}

// ── Operations ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_power_on_accepted() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    Mock::given(method("POST"))
        .and(path("/v2/operations/BTDI/servers/powerOn"))
        .and(body_json(json!([ID])))
        .respond_with(ResponseTemplate::new(200).set_body_json(queued("wa1-1001")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = s.power_on().await.unwrap();

    match outcome {
        OperationOutcome::Accepted { requests } => {
            assert_eq!(requests.len(), 1);
            assert_eq!(requests.iter().next().unwrap().id, "wa1-1001");
        }
        other => panic!("expected Accepted, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_power_on_already_on_is_soft_failure() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    Mock::given(method("POST"))
        .and(path("/v2/operations/BTDI/servers/powerOn"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "server": ID,
            "isQueued": false,
            "errorMessage": "The server already powered on"
        }])))
        .mount(&server)
        .await;

    let outcome = s.power_on().await.unwrap();

    assert!(!outcome.is_accepted());
    assert!(outcome.requests().is_empty());
    match outcome {
        OperationOutcome::AlreadyInState(conflict) => assert_eq!(conflict.server, ID),
        other => panic!("expected AlreadyInState, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_maintenance_path() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    Mock::given(method("POST"))
        .and(path("/v2/operations/BTDI/servers/startMaintenance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(queued("wa1-2002")))
        .expect(1)
        .mount(&server)
        .await;

    assert!(s.start_maintenance().await.unwrap().is_accepted());
}

#[tokio::test]
async fn test_execute_package_body() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();
    let package_id = Uuid::parse_str("77ab3844-579d-4c8d-8955-c69a94a2ba1a").unwrap();

    Mock::given(method("POST"))
        .and(path("/v2/operations/BTDI/servers/executePackage"))
        .and(body_json(json!({
            "servers": [ID],
            "package": {
                "packageId": "77ab3844-579d-4c8d-8955-c69a94a2ba1a",
                "parameters": { "mode": "fast" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(queued("wa1-3003")))
        .expect(1)
        .mount(&server)
        .await;

    let params = HashMap::from([("mode".to_string(), "fast".to_string())]);
    let requests = s.execute_package(package_id, &params).await.unwrap();
    assert_eq!(requests.len(), 1);
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_all_snapshots_aggregates_one_request_each() {
    let (server, client) = setup().await;
    let doc = document(&[snapshot("a", 1), snapshot("b", 2)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    for (index, request_id) in [(1, "wa1-11"), (2, "wa1-12")] {
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/{index}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_link(request_id)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let requests = s.delete_snapshot(None).await.unwrap();

    assert_eq!(requests.len(), 2);
    let ids: Vec<_> = requests.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["wa1-11", "wa1-12"]);
}

#[tokio::test]
async fn test_delete_unknown_snapshot_fails_without_calls() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[snapshot("a", 1)]))
        .unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let names = vec!["a".to_string(), "missing".to_string()];
    let result = s.delete_snapshot(Some(&names)).await;

    assert!(
        matches!(result, Err(Error::SnapshotNotFound { ref name }) if name == "missing"),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_restore_without_snapshots_fails() {
    let (_server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    let result = s.restore_snapshot(None).await;
    assert!(matches!(result, Err(Error::NoSnapshots)), "got: {result:?}");
}

#[tokio::test]
async fn test_restore_defaults_to_first_snapshot() {
    let (server, client) = setup().await;
    let doc = document(&[snapshot("first", 1), snapshot("second", 2)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/1/restore")))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_link("wa1-21")))
        .expect(1)
        .mount(&server)
        .await;

    let requests = s.restore_snapshot(None).await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_delete_named_snapshot_leaves_others() {
    let (server, client) = setup().await;
    let doc = document(&[snapshot("a", 1), snapshot("b", 2), snapshot("c", 3)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    for (index, calls) in [(1, 0), (2, 1), (3, 0)] {
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/{index}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_link("wa1-31")))
            .expect(calls)
            .mount(&server)
            .await;
    }

    let names = vec!["b".to_string()];
    let requests = s.delete_snapshot(Some(&names)).await.unwrap();

    assert_eq!(requests.len(), 1);
    assert_eq!(requests.iter().next().unwrap().id, "wa1-31");
}

#[tokio::test]
async fn test_restore_named_snapshot() {
    let (server, client) = setup().await;
    let doc = document(&[snapshot("a", 1), snapshot("b", 2)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/1/restore")))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_link("wa1-41")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/2/restore")))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_link("wa1-42")))
        .expect(1)
        .mount(&server)
        .await;

    let requests = s.restore_snapshot(Some("b")).await.unwrap();
    assert_eq!(requests.iter().next().unwrap().id, "wa1-42");
}

#[tokio::test]
async fn test_snapshot_without_restore_link_fails_without_calls() {
    let (server, client) = setup().await;
    let bare = json!({
        "name": "a",
        "links": [{ "rel": "self", "href": format!("/v2/servers/BTDI/{ID}/snapshots/1") }]
    });
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[bare])).unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = s.restore_snapshot(Some("a")).await;
    assert!(
        matches!(
            result,
            Err(Error::LinkNotFound { ref name, ref rel }) if name == "a" && rel == "restore"
        ),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_snapshot_links_keep_endpoint_prefix() {
    let server = MockServer::start().await;
    let endpoint = format!("{}/clc", server.uri());
    let client = ClcClient::from_reqwest(&endpoint, reqwest::Client::new()).unwrap();
    let doc = document(&[snapshot("a", 1)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/clc/v2/servers/BTDI/{ID}/snapshots/1/restore")))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_link("wa1-51")))
        .expect(1)
        .mount(&server)
        .await;

    let requests = s.restore_snapshot(None).await.unwrap();
    assert_eq!(requests.len(), 1);
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_rejects_hyperscale_premium_before_network() {
    let (server, client) = setup().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = CreateServer::new("web", "UBUNTU-14-64-TEMPLATE", "wa1-12345", 2, 4);
    request.server_type = ServerType::Hyperscale;
    request.storage_type = StorageType::Premium;

    let result = Server::create(&client, &request, None).await;
    assert!(matches!(result, Err(Error::Validation { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_create_queues_build() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v2/servers/BTDI"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "server": "web",
            "isQueued": true,
            "links": [status_link("wa1-31"), { "rel": "self", "href": "/v2/servers/BTDI/web?uuid=true" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateServer::new("web", "UBUNTU-14-64-TEMPLATE", "wa1-12345", 2, 4);
    let requests = Server::create(&client, &request, None).await.unwrap();
    assert_eq!(requests.iter().next().unwrap().id, "wa1-31");
}

#[tokio::test]
async fn test_delete_server() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    Mock::given(method("DELETE"))
        .and(path(format!("/v2/servers/BTDI/{ID}")))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "server": ID,
            "isQueued": true,
            "links": [status_link("wa1-41")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requests = s.delete().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_group_lookup() {
    let (server, client) = setup().await;
    let s = Server::from_document(&client, ID, Some("BTDI"), document(&[])).unwrap();

    Mock::given(method("GET"))
        .and(path("/v2/groups/BTDI/2a5c0b9662cf4fc8bf6180f139facdc0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "2a5c0b9662cf4fc8bf6180f139facdc0",
            "name": "Ansible Managed Servers",
            "locationId": "WA1",
            "type": "default",
            "status": "active",
            "serversCount": 3
        })))
        .mount(&server)
        .await;

    let group = s.group().await.unwrap();
    assert_eq!(group.to_string(), "Ansible Managed Servers");
    assert_eq!(group.data().servers_count, Some(3));
}

// ── Request tracking ────────────────────────────────────────────────

#[tokio::test]
async fn test_wait_until_complete_counts_failures() {
    let (server, client) = setup().await;
    let doc = document(&[snapshot("a", 1), snapshot("b", 2)]);
    let s = Server::from_document(&client, ID, Some("BTDI"), doc).unwrap();

    for (index, request_id) in [(1, "wa1-51"), (2, "wa1-52")] {
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/servers/BTDI/{ID}/snapshots/{index}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_link(request_id)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/v2/operations/BTDI/status/wa1-51"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "succeeded" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/operations/BTDI/status/wa1-52"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "failed" })))
        .mount(&server)
        .await;

    let requests = s.delete_snapshot(None).await.unwrap();
    let failed = requests
        .wait_until_complete(&client, Duration::from_millis(10))
        .await
        .unwrap();

    assert_eq!(failed, 1);
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_injects_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/authentication/login"))
        .and(body_json(json!({ "username": "owen", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userName": "owen",
            "accountAlias": "BTDI",
            "locationAlias": "WA1",
            "roles": ["AccountAdmin"],
            "bearerToken": "tok-123"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/BTDI/{ID}")))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let password: secrecy::SecretString = "hunter2".to_string().into();
    let client = ClcClient::login(&server.uri(), "owen", &password, &TransportConfig::default())
        .await
        .unwrap();

    assert_eq!(client.session().unwrap().account_alias, "BTDI");
    let s = Server::load(&client, ID, None).await.unwrap();
    assert_eq!(s.to_string(), ID);
}

#[tokio::test]
async fn test_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/authentication/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "bad creds" })))
        .mount(&server)
        .await;

    let password: secrecy::SecretString = "nope".to_string().into();
    let result =
        ClcClient::login(&server.uri(), "owen", &password, &TransportConfig::default()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}
