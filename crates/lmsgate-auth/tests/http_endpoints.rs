//! OAuth2 endpoints over a real listener.

mod common;

use axum::Router;
use common::*;
use lmsgate_auth::{OAuthState, oauth_router};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let fx = fixture(10);
        let app = Router::new().nest("/v1/oauth2", oauth_router(OAuthState::new(fx.grants)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{addr}/v1/oauth2"),
            client,
            shutdown: Some(tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn password_grant(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/token"))
            .form(&[
                ("grant_type", "password"),
                ("api_key", "acme"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn password_grant_then_tokeninfo() {
    let server = TestServer::start().await;

    let res = server.password_grant("alice", "wonderland").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert_eq!(res.headers()["pragma"], "no-cache");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    assert!(body["refresh_token"].is_string());
    let access_token = body["access_token"].as_str().unwrap().to_string();

    // Query parameter
    let res = server
        .client
        .get(server.url("/tokeninfo"))
        .query(&[("access_token", access_token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let info: Value = res.json().await.unwrap();
    assert_eq!(info["user"], "alice");
    assert_eq!(info["api_key"], "acme");
    assert_eq!(info["type"], "access");

    // Bearer header
    let res = server
        .client
        .get(server.url("/tokeninfo"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // JSON body
    let res = server
        .client
        .post(server.url("/tokeninfo"))
        .json(&serde_json::json!({ "token": access_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tokeninfo_errors_are_bad_requests() {
    let server = TestServer::start().await;

    let res = server.client.get(server.url("/tokeninfo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    let res = server
        .client
        .get(server.url("/tokeninfo"))
        .query(&[("access_token", "garbage")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_credentials_are_bare_401() {
    let server = TestServer::start().await;

    let res = server.password_grant("alice", "nope").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_grant_type_is_bad_request() {
    let server = TestServer::start().await;

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[("grant_type", "device_code"), ("api_key", "acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn unreadable_token_request_is_bad_request() {
    let server = TestServer::start().await;

    // Form without grant_type
    let res = server
        .client
        .post(server.url("/token"))
        .form(&[("api_key", "acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert_eq!(res.headers()["pragma"], "no-cache");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    // Not a form at all
    let res = server
        .client
        .post(server.url("/token"))
        .json(&serde_json::json!({ "grant_type": "password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()["cache-control"], "no-store");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn session_exchange_over_http() {
    let server = TestServer::start().await;

    // JSON body
    let res = server
        .client
        .post(server.url("/session/bearer"))
        .json(&serde_json::json!({
            "api_key": "acme",
            "user_id": 1,
            "rtoken": "alice-rtoken",
            "session_id": "alice-session",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "no-store");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["user"], "alice");
    assert_eq!(body["token"]["token_type"], "bearer");
    let access_token = body["token"]["access_token"].as_str().unwrap().to_string();

    let res = server
        .client
        .get(server.url("/tokeninfo"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    let info: Value = res.json().await.unwrap();
    assert_eq!(info["user"], "alice");

    // Form body with a wrong request token
    let res = server
        .client
        .post(server.url("/session/bearer"))
        .form(&[
            ("api_key", "acme"),
            ("user_id", "1"),
            ("rtoken", "wrong"),
            ("session_id", "alice-session"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "login_failed");

    // Missing fields
    let res = server
        .client
        .post(server.url("/session/bearer"))
        .form(&[("api_key", "acme")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn client_credentials_via_basic_auth() {
    let server = TestServer::start().await;

    let res = server
        .client
        .post(server.url("/token"))
        .basic_auth("acme", Some("acme-secret"))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn authorization_code_flow_over_http() {
    let server = TestServer::start().await;

    // Login page first
    let res = server
        .client
        .get(server.url("/auth"))
        .query(&[
            ("api_key", "acme"),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "showLogin");
    assert_eq!(body["data"]["api_key"], "acme");

    // Submitted login form
    let res = server
        .client
        .post(server.url("/auth"))
        .form(&[
            ("api_key", "acme"),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("username", "alice"),
            ("password", "wonderland"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let code = code_from_redirect(&location);

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("api_key", "acme"),
            ("api_secret", "acme-secret"),
            ("code", code.as_str()),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn authorize_with_unknown_client_is_401_json() {
    let server = TestServer::start().await;

    let res = server
        .client
        .get(server.url("/auth"))
        .query(&[
            ("api_key", "unknown"),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn refresh_entry_info_and_revoke() {
    let server = TestServer::start().await;

    let body: Value = server
        .password_grant("alice", "wonderland")
        .await
        .json()
        .await
        .unwrap();
    let access_token = body["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let res = server
        .client
        .get(server.url("/refresh/info"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    let res = server
        .client
        .get(server.url("/refresh/info"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let info: Value = res.json().await.unwrap();
    assert_eq!(info["num_refresh_left"], 10);
    assert_eq!(info["num_resets"], 0);

    let res = server
        .client
        .delete(server.url("/refresh"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/refresh/info"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
