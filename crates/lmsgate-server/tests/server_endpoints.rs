use lmsgate_auth::credentials::hash_secret;
use lmsgate_auth::types::{ClientRegistration, GrantType, UserId};
use lmsgate_server::{AppConfig, UserConfig, build_app};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.token.secret = "0123456789abcdef0123456789abcdef".into();
    cfg.users = vec![
        UserConfig {
            id: 1,
            login: "alice".into(),
            password_hash: Some(hash_secret("wonderland").unwrap()),
        },
        UserConfig {
            id: 3,
            login: "svc".into(),
            password_hash: None,
        },
    ];
    cfg.clients = vec![ClientRegistration {
        api_key: "acme".into(),
        secret_hash: Some(hash_secret("acme-secret").unwrap()),
        grant_types: vec![GrantType::ResourceOwner, GrantType::ClientCredentials],
        refresh_token_grants: vec![GrantType::ResourceOwner],
        consent_message: None,
        allowed_users: vec![-1],
        service_account: Some(UserId(3)),
    }];
    cfg
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&test_config()).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn server_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();
    let oauth = format!("{base}/v1/oauth2");

    // GET /
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "lmsgate");

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // Password grant
    let resp = client
        .post(format!("{oauth}/token"))
        .form(&[
            ("grant_type", "password"),
            ("api_key", "acme"),
            ("username", "alice"),
            ("password", "wonderland"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let access_token = body["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    // Token info
    let resp = client
        .get(format!("{oauth}/tokeninfo"))
        .query(&[("access_token", access_token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"], "alice");
    assert_eq!(body["api_key"], "acme");
    assert_eq!(body["type"], "access");

    // Refresh grant
    let resp = client
        .post(format!("{oauth}/token"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Refresh entry counters
    let resp = client
        .get(format!("{oauth}/refresh/info"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["num_refresh_left"], 9999);

    // Client credentials via HTTP Basic
    let resp = client
        .post(format!("{oauth}/token"))
        .basic_auth("acme", Some("acme-secret"))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Wrong password: bare 401
    let resp = client
        .post(format!("{oauth}/token"))
        .form(&[
            ("grant_type", "password"),
            ("api_key", "acme"),
            ("username", "alice"),
            ("password", "nope"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
