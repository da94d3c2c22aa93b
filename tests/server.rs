//! Real listener, real HTTP client, graceful shutdown.

mod common;

use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use common::test_config;
use tenant_platform::lifecycle::{bootstrap, Backends, Shutdown};
use tenant_platform::HttpServer;

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = test_config();
    let shutdown = Shutdown::new();
    let backends = Backends::from_config(&config).unwrap();
    let platform = bootstrap(config, backends, &shutdown).unwrap();

    let (updates_tx, updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(platform.state.clone());
    let handle = tokio::spawn(server.run(listener, updates, shutdown.signalled()));

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let res = client
        .post(format!("{base}/api/v1/auth/register"))
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .json(&json!({
            "organization_name": "Acme",
            "organization_slug": "acme-co",
            "email": "a@acme.io",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    assert!(res.headers().contains_key("x-request-id"));
    let tokens: Value = res.json().await.unwrap();
    let token = tokens["access_token"].as_str().unwrap();

    let res = client
        .patch(format!("{base}/api/v1/organizations/me"))
        .bearer_auth(token)
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .json(&json!({ "name": "Acme Corp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let logs: Value = client
        .get(format!("{base}/api/v1/audit-logs"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs[0]["ip_address"], "203.0.113.7");

    // Reload with signup off; takes effect without restart.
    let mut reloaded = test_config();
    reloaded.features.signup = false;
    updates_tx.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!platform.state.config().features.signup);

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), platform.worker)
        .await
        .unwrap()
        .unwrap();
}
