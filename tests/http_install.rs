//! HTTP client tests against an in-process stub of the install service.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;

use packbench_core::share::{InstallClient, InstallError, HttpInstallClient};

#[derive(Deserialize)]
struct InstallRequest {
    files: BTreeMap<String, String>,
}

async fn spawn_stub(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn test_create_install_returns_hash() {
    let router = Router::new().route(
        "/api/install",
        post(|Json(request): Json<InstallRequest>| async move {
            // Echo the file count back through the hash so the test can
            // verify the payload shape went over the wire intact.
            Json(json!({ "hash": format!("stub{}", request.files.len()) }))
        }),
    );
    let addr = spawn_stub(router).await;

    let client = HttpInstallClient::new(&format!("http://{addr}")).unwrap();
    let files: BTreeMap<String, String> = [
        ("a.md".to_string(), "alpha".to_string()),
        ("docs/b.md".to_string(), "beta".to_string()),
    ]
    .into();

    let hash = client.create_install(&files).await.unwrap();
    assert_eq!(hash, "stub2");
}

#[tokio::test]
async fn test_create_install_maps_non_2xx_to_status_error() {
    let router = Router::new().route(
        "/api/install",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let addr = spawn_stub(router).await;

    let client = HttpInstallClient::new(&format!("http://{addr}")).unwrap();
    let files: BTreeMap<String, String> = [("a.md".to_string(), "x".to_string())].into();

    match client.create_install(&files).await {
        Err(InstallError::Status(status)) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_install_rejects_malformed_body() {
    let router = Router::new().route(
        "/api/install",
        post(|| async { Json(json!({ "unexpected": true })) }),
    );
    let addr = spawn_stub(router).await;

    let client = HttpInstallClient::new(&format!("http://{addr}")).unwrap();
    let files: BTreeMap<String, String> = [("a.md".to_string(), "x".to_string())].into();

    assert!(matches!(
        client.create_install(&files).await,
        Err(InstallError::Malformed(_))
    ));
}
