//! Shared fixtures: a grant service over in-memory collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use lmsgate_auth::config::{AuthConfig, TokenConfig};
use lmsgate_auth::credentials::hash_secret;
use lmsgate_auth::prelude::*;

pub const SECRET: &str = "test-signing-secret-0123456789abcdef";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

pub struct Fixture {
    pub grants: Arc<GrantService>,
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<InMemorySessionAuthenticator>,
}

fn client(
    api_key: &str,
    secret: &str,
    grant_types: Vec<GrantType>,
    refresh_token_grants: Vec<GrantType>,
) -> ClientRegistration {
    ClientRegistration {
        api_key: api_key.to_string(),
        secret_hash: Some(hash_secret(secret).unwrap()),
        grant_types,
        refresh_token_grants,
        consent_message: None,
        allowed_users: vec![-1],
        service_account: None,
    }
}

/// Clients:
/// - `acme`: every grant, refresh tokens for password and code, service account `svc`
/// - `consent`: code + implicit, asks for consent
/// - `restricted`: password grant for `bob` only
/// - `implicit-only`: implicit grant only
/// - `closed`: password grant with an empty allowed-user list
///
/// Users: `alice`/`wonderland` (1), `bob`/`builder` (2), `svc` (3).
///
/// Sessions: `alice-session` of alice with request token `alice-rtoken`.
pub fn fixture(quota: u32) -> Fixture {
    let mut config = AuthConfig::default();
    config.token = TokenConfig {
        secret: SECRET.to_string(),
        ..TokenConfig::default()
    };
    config.refresh.quota = quota;

    let mut acme = client(
        "acme",
        "acme-secret",
        vec![
            GrantType::AuthorizationCode,
            GrantType::Implicit,
            GrantType::ResourceOwner,
            GrantType::ClientCredentials,
        ],
        vec![GrantType::AuthorizationCode, GrantType::ResourceOwner],
    );
    acme.service_account = Some(UserId(3));

    let mut consent = client(
        "consent",
        "consent-secret",
        vec![GrantType::AuthorizationCode, GrantType::Implicit],
        vec![],
    );
    consent.consent_message = Some("Allow consent-app to read your courses?".to_string());

    let mut restricted = client("restricted", "restricted-secret", vec![GrantType::ResourceOwner], vec![]);
    restricted.allowed_users = vec![2];

    let implicit_only = client("implicit-only", "implicit-secret", vec![GrantType::Implicit], vec![]);

    let mut closed = client("closed", "closed-secret", vec![GrantType::ResourceOwner], vec![]);
    closed.allowed_users = vec![];

    let clients = Arc::new(
        InMemoryClientRegistry::from_registrations([
            acme,
            consent,
            restricted,
            implicit_only,
            closed,
        ])
            .unwrap(),
    );

    let users = Arc::new(InMemoryUserDirectory::new());
    users.insert(UserId(1), "alice");
    users.insert(UserId(2), "bob");
    users.insert(UserId(3), "svc");

    let identity = InMemoryIdentityAuthenticator::new(clients.clone());
    identity
        .set_password_hash("alice", hash_secret("wonderland").unwrap())
        .unwrap();
    identity
        .set_password_hash("bob", hash_secret("builder").unwrap())
        .unwrap();

    let codec = Arc::new(TokenCodec::new(config.token.clone()));
    let refresh = Arc::new(RefreshTokenService::new(
        Arc::new(InMemoryRefreshTokenStorage::new()),
        users.clone(),
        codec.clone(),
        &config,
    ));
    let sessions = Arc::new(InMemorySessionAuthenticator::new());
    sessions.open("alice-session", UserId(1), "alice-rtoken");

    let grants = Arc::new(
        GrantService::new(
            clients,
            Arc::new(identity),
            users,
            codec.clone(),
            refresh,
            &config,
        )
        .with_session_authenticator(sessions.clone()),
    );

    Fixture {
        grants,
        codec,
        sessions,
    }
}

pub fn authorization_request(api_key: &str, response_type: &str) -> AuthorizationRequest {
    AuthorizationRequest {
        api_key: api_key.to_string(),
        redirect_uri: REDIRECT_URI.to_string(),
        response_type: response_type.to_string(),
        ..Default::default()
    }
}

pub fn session_request(api_key: &str, user_id: i64, rtoken: &str, session_id: &str) -> SessionExchangeRequest {
    SessionExchangeRequest {
        api_key: api_key.to_string(),
        user_id: UserId(user_id),
        rtoken: rtoken.to_string(),
        session_id: session_id.to_string(),
    }
}

pub fn with_login(mut req: AuthorizationRequest, username: &str, password: &str) -> AuthorizationRequest {
    req.username = Some(username.to_string());
    req.password = Some(password.to_string());
    req
}

/// Extracts the `code` query parameter of a redirect URL.
pub fn code_from_redirect(url: &str) -> String {
    let url = url::Url::parse(url).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

/// Parses the fragment of an implicit-grant redirect.
pub fn fragment_params(url: &str) -> Vec<(String, String)> {
    let url = url::Url::parse(url).unwrap();
    url::form_urlencoded::parse(url.fragment().unwrap_or_default().as_bytes())
        .into_owned()
        .collect()
}
