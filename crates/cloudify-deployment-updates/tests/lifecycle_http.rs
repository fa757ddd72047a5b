//! Drives the update lifecycle against a mock manager over HTTP.

use cloudify_core::client::ClientConfig;
use cloudify_core::config::ManagerClientConfig;
use cloudify_core::Error;
use cloudify_deployment_updates::{
    BlueprintSource, CommitOptions, DeploymentUpdateState, DeploymentUpdatesClient, ListParams,
    UpdateOptions,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> DeploymentUpdatesClient {
    let config = ManagerClientConfig::new(format!("{}/api/v3.1", server.uri()))
        .unwrap()
        .with_timeout(5);
    DeploymentUpdatesClient::builder(config)
        .with_http_config(ClientConfig::new().with_connect_timeout(Duration::from_secs(2)))
        .build()
        .unwrap()
}

fn blueprint_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("app");
    std::fs::create_dir_all(&app).unwrap();
    std::fs::write(app.join("blueprint.yaml"), "tosca_definitions_version: v1").unwrap();
    dir
}

#[tokio::test]
async fn stage_extract_commit_finalize() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates"))
        .and(query_param("deployment_id", "hello"))
        .and(query_param("application_file_name", "blueprint.yaml"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u1", "deployment_id": "hello", "state": "staged"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates/u1/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "deployment_id": "hello", "state": "updating",
            "steps": [{"action": "add", "entity_type": "node", "entity_id": "web"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates/u1/commit"))
        .and(body_json(json!({
            "workflow_id": null, "skip_install": false, "skip_uninstall": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "deployment_id": "hello", "state": "executing", "execution_id": "e1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates/u1/finalize_commit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "deployment_id": "hello", "state": "successful", "execution_id": "e1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let blueprint = blueprint_dir();
    let source = BlueprintSource::blueprint_file(blueprint.path().join("app/blueprint.yaml"))
        .unwrap();

    let staged = client.stage("hello", &source, None).await.unwrap();
    let extracted = client.extract_steps(&staged.id).await.unwrap();
    assert_eq!(extracted.steps.len(), 1);
    let committed = client
        .commit(&extracted.id, &CommitOptions::default())
        .await
        .unwrap();
    assert_eq!(committed.execution_id.as_deref(), Some("e1"));
    let finalized = client.finalize_commit(&committed.id).await.unwrap();
    assert_eq!(finalized.state, DeploymentUpdateState::Successful);

    let requests = server.received_requests().await.unwrap();
    let upload = &requests[0];
    let content_type = upload
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("name=\"update_archive\""));
    assert!(body.contains("filename=\"app.tar\""));
    assert!(body.contains("tosca_definitions_version: v1"));
}

#[tokio::test]
async fn stage_rejects_unexpected_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "deployment_id": "hello", "state": "staged"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .stage(
            "hello",
            &BlueprintSource::archive("http://example.com/app.tar.gz"),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(200));
    assert!(matches!(err, Error::UnexpectedStatus { expected: 201, .. }));
}

#[tokio::test]
async fn composite_update_with_remote_archive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates"))
        .and(query_param(
            "blueprint_archive_url",
            "http://example.com/app.tar.gz",
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u9", "deployment_id": "hello", "state": "staged"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates/u9/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u9", "deployment_id": "hello", "state": "updating"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3.1/deployment-updates/u9/commit"))
        .and(body_json(json!({
            "workflow_id": null, "skip_install": true, "skip_uninstall": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u9", "deployment_id": "hello", "state": "executing", "execution_id": "e9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = UpdateOptions {
        skip_install: true,
        ..UpdateOptions::default()
    };
    let update = client_for(&server)
        .await
        .update("hello", "http://example.com/app.tar.gz", &options)
        .await
        .unwrap();
    assert_eq!(update.id, "u9");
    assert_eq!(update.state, DeploymentUpdateState::Executing);
}

#[tokio::test]
async fn get_unknown_update_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3.1/deployment-updates/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.get("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn list_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3.1/deployment-updates"))
        .and(query_param("deployment_id", "hello"))
        .and(query_param("_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "u1", "deployment_id": "hello", "state": "successful"},
                {"id": "u2", "deployment_id": "hello", "state": "staged"}
            ],
            "metadata": {"pagination": {"total": 5, "size": 2, "offset": 0}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = ListParams {
        size: Some(2),
        ..ListParams::for_deployment("hello")
    };
    let page = client_for(&server).await.list(&params).await.unwrap();
    let ids: Vec<&str> = page.iter().map(|update| update.id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u2"]);
    assert!(page.metadata.pagination.has_more(page.len()));
}
