//! Grant-type state machine against in-memory collaborators.

mod common;

use common::*;
use lmsgate_auth::prelude::*;
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// Resource owner password credentials
// =============================================================================

#[tokio::test]
async fn resource_owner_issues_bearer_and_refresh_token() {
    let fx = fixture(10);

    let bearer = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await);
    assert_eq!(bearer.token_type, "bearer");
    assert_eq!(bearer.expires_in, 1800);
    assert!(bearer.refresh_token.is_some());

    let info = assert_ok!(fx.grants.token_info(&bearer.access_token));
    assert_eq!(info.user, "alice");
    assert_eq!(info.api_key, "acme");
    assert_eq!(info.kind, TokenKind::Access);
    assert!(info.expires_in > 1700 && info.expires_in <= 1800);
}

#[tokio::test]
async fn resource_owner_wrong_password_fails() {
    let fx = fixture(10);

    for api_key in ["acme", "restricted", "unknown"] {
        let err = assert_err!(fx.grants.resource_owner(api_key, "alice", "nope").await);
        assert!(matches!(err, AuthError::LoginFailed { .. }), "{api_key}");
    }
}

#[tokio::test]
async fn resource_owner_respects_allowed_users() {
    let fx = fixture(10);

    let err = assert_err!(fx.grants.resource_owner("restricted", "alice", "wonderland").await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    let bearer = assert_ok!(fx.grants.resource_owner("restricted", "bob", "builder").await);
    // Refresh tokens are not enabled for this key
    assert!(bearer.refresh_token.is_none());
}

#[tokio::test]
async fn resource_owner_empty_allowed_users_admits_nobody() {
    let fx = fixture(10);

    for (user, password) in [("alice", "wonderland"), ("bob", "builder")] {
        let err = assert_err!(fx.grants.resource_owner("closed", user, password).await);
        assert!(matches!(err, AuthError::LoginFailed { .. }), "{user}");
    }
}

#[tokio::test]
async fn resource_owner_requires_enabled_grant() {
    let fx = fixture(10);
    let err = assert_err!(fx.grants.resource_owner("consent", "alice", "wonderland").await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));
}

// =============================================================================
// Client credentials
// =============================================================================

#[tokio::test]
async fn client_credentials_act_as_service_account() {
    let fx = fixture(10);

    let bearer = assert_ok!(fx.grants.client_credentials("acme", "acme-secret").await);
    assert!(bearer.refresh_token.is_none());

    let info = assert_ok!(fx.grants.token_info(&bearer.access_token));
    assert_eq!(info.user, "svc");
    assert_eq!(info.api_key, "acme");
}

#[tokio::test]
async fn client_credentials_reject_bad_secret_and_disabled_grant() {
    let fx = fixture(10);

    let err = assert_err!(fx.grants.client_credentials("acme", "wrong").await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    let err = assert_err!(fx.grants.client_credentials("consent", "consent-secret").await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));
}

// =============================================================================
// Authorization endpoint
// =============================================================================

#[tokio::test]
async fn authorize_without_credentials_shows_login() {
    let fx = fixture(10);

    let outcome = assert_ok!(fx.grants.authorize(&authorization_request("acme", "code")).await);
    let AuthorizationOutcome::ShowLogin(prompt) = outcome else {
        panic!("expected login page, got {outcome:?}");
    };
    assert_eq!(prompt.error_msg, None);
    assert_eq!(prompt.api_key, "acme");
    assert_eq!(prompt.redirect_uri, REDIRECT_URI);
    assert_eq!(prompt.response_type, "code");
}

#[tokio::test]
async fn authorize_with_wrong_password_shows_login_error() {
    let fx = fixture(10);

    let req = with_login(authorization_request("acme", "code"), "alice", "nope");
    let outcome = assert_ok!(fx.grants.authorize(&req).await);
    let AuthorizationOutcome::ShowLogin(prompt) = outcome else {
        panic!("expected login page, got {outcome:?}");
    };
    assert!(prompt.error_msg.is_some());
}

#[tokio::test]
async fn authorize_policy_checks() {
    let fx = fixture(10);

    let err = assert_err!(fx.grants.authorize(&authorization_request("unknown", "code")).await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    let err = assert_err!(fx.grants.authorize(&authorization_request("acme", "id_token")).await);
    assert!(matches!(err, AuthError::ResponseType { .. }));

    // Authorization-code grant disabled for this key
    let err = assert_err!(
        fx.grants
            .authorize(&authorization_request("implicit-only", "code"))
            .await
    );
    assert!(matches!(err, AuthError::LoginFailed { .. }));
}

#[tokio::test]
async fn authorization_code_round_trip() {
    let fx = fixture(10);

    let req = with_login(authorization_request("acme", "code"), "alice", "wonderland");
    let AuthorizationOutcome::Redirect(url) = assert_ok!(fx.grants.authorize(&req).await) else {
        panic!("expected redirect");
    };
    assert!(url.starts_with(&format!("{REDIRECT_URI}?code=")));

    let code = code_from_redirect(&url);
    let bearer = assert_ok!(
        fx.grants
            .authorization_code("acme", "acme-secret", &code, REDIRECT_URI)
            .await
    );
    assert!(bearer.refresh_token.is_some());

    let info = assert_ok!(fx.grants.token_info(&bearer.access_token));
    assert_eq!(info.user, "alice");
}

#[tokio::test]
async fn authorization_code_must_match_request() {
    let fx = fixture(10);

    let req = with_login(authorization_request("acme", "code"), "alice", "wonderland");
    let AuthorizationOutcome::Redirect(url) = assert_ok!(fx.grants.authorize(&req).await) else {
        panic!("expected redirect");
    };
    let code = code_from_redirect(&url);

    // Different redirect_uri
    let err = assert_err!(
        fx.grants
            .authorization_code("acme", "acme-secret", &code, "https://evil.example.com/cb")
            .await
    );
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    // Different client with valid credentials of its own
    let err = assert_err!(
        fx.grants
            .authorization_code("consent", "consent-secret", &code, REDIRECT_URI)
            .await
    );
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    // Wrong secret is checked before the code
    let err = assert_err!(
        fx.grants
            .authorization_code("acme", "wrong", "garbage", REDIRECT_URI)
            .await
    );
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    // Right secret, garbage code
    let err = assert_err!(
        fx.grants
            .authorization_code("acme", "acme-secret", "garbage", REDIRECT_URI)
            .await
    );
    assert!(matches!(err, AuthError::MalformedToken { .. }));
}

#[tokio::test]
async fn access_token_is_not_an_authorization_code() {
    let fx = fixture(10);
    let bearer = assert_ok!(fx.codec.issue_bearer("alice", "acme"));

    let err = assert_err!(
        fx.grants
            .authorization_code("acme", "acme-secret", &bearer.access_token, REDIRECT_URI)
            .await
    );
    assert!(matches!(err, AuthError::InvalidTokenKind { .. }));
}

#[tokio::test]
async fn implicit_grant_redirects_with_fragment() {
    let fx = fixture(10);

    let mut req = with_login(authorization_request("acme", "token"), "alice", "wonderland");
    req.state = Some("abc123".to_string());

    let AuthorizationOutcome::Redirect(url) = assert_ok!(fx.grants.authorize(&req).await) else {
        panic!("expected redirect");
    };
    let params = fragment_params(&url);
    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };

    assert_eq!(get("token_type").as_deref(), Some("bearer"));
    assert_eq!(get("expires_in").as_deref(), Some("1800"));
    assert_eq!(get("state").as_deref(), Some("abc123"));

    let info = assert_ok!(fx.grants.token_info(&get("access_token").unwrap()));
    assert_eq!(info.user, "alice");
    assert_eq!(info.kind, TokenKind::Access);
}

// =============================================================================
// Consent
// =============================================================================

#[tokio::test]
async fn consent_round_trip() {
    let fx = fixture(10);

    let req = with_login(authorization_request("consent", "code"), "alice", "wonderland");
    let outcome = assert_ok!(fx.grants.authorize(&req).await);
    let AuthorizationOutcome::ShowPermission(prompt) = outcome else {
        panic!("expected permission page, got {outcome:?}");
    };
    assert_eq!(
        prompt.oauth2_consent_message,
        "Allow consent-app to read your courses?"
    );

    let ticket = assert_ok!(fx.codec.parse(&prompt.authenticity_token));
    assert_eq!(ticket.kind(), TokenKind::Authenticity);

    let mut approve = authorization_request("consent", "code");
    approve.authenticity_token = Some(prompt.authenticity_token);
    let AuthorizationOutcome::Redirect(url) = assert_ok!(fx.grants.authorize(&approve).await) else {
        panic!("expected redirect");
    };

    let code = code_from_redirect(&url);
    let bearer = assert_ok!(
        fx.grants
            .authorization_code("consent", "consent-secret", &code, REDIRECT_URI)
            .await
    );
    assert!(bearer.refresh_token.is_none());
}

#[tokio::test]
async fn authenticity_token_is_bound_to_api_key_and_kind() {
    let fx = fixture(10);

    // Ticket minted for another key
    let ticket = assert_ok!(fx.codec.mint(
        "alice",
        "acme",
        TokenKind::Authenticity,
        "",
        std::time::Duration::from_secs(600),
    ));
    let mut req = authorization_request("consent", "code");
    req.authenticity_token = Some(ticket.into_string());
    let err = assert_err!(fx.grants.authorize(&req).await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    // An access token is not a consent ticket
    let bearer = assert_ok!(fx.codec.issue_bearer("alice", "consent"));
    let mut req = authorization_request("consent", "code");
    req.authenticity_token = Some(bearer.access_token);
    let err = assert_err!(fx.grants.authorize(&req).await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));

    // Garbage
    let mut req = authorization_request("consent", "code");
    req.authenticity_token = Some("garbage".to_string());
    let err = assert_err!(fx.grants.authorize(&req).await);
    assert!(matches!(err, AuthError::MalformedToken { .. }));
}

#[tokio::test]
async fn expired_authenticity_token_is_rejected() {
    let fx = fixture(10);

    let ticket = assert_ok!(fx.codec.mint_at(
        time::OffsetDateTime::now_utc() - time::Duration::hours(1),
        "alice",
        "consent",
        TokenKind::Authenticity,
        "",
        std::time::Duration::from_secs(600),
    ));
    let mut req = authorization_request("consent", "code");
    req.authenticity_token = Some(ticket.into_string());

    let err = assert_err!(fx.grants.authorize(&req).await);
    assert!(matches!(err, AuthError::TokenExpired));
}

// =============================================================================
// Refresh tokens
// =============================================================================

#[tokio::test]
async fn refresh_grant_issues_new_bearer() {
    let fx = fixture(10);

    let bearer = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await);
    let refresh_token = bearer.refresh_token.unwrap();

    let refreshed = assert_ok!(fx.grants.refresh(&refresh_token).await);
    assert_ne!(refreshed.access_token, bearer.access_token);
    assert!(refreshed.refresh_token.is_none());

    let info = assert_ok!(fx.grants.refresh_tokens().entry_info("alice", "acme").await).unwrap();
    assert_eq!(info.num_refresh_left, 9);
}

#[tokio::test]
async fn second_grant_invalidates_first_refresh_token() {
    let fx = fixture(10);

    let first = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();
    let second = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();

    let err = assert_err!(fx.grants.refresh(&first).await);
    assert!(matches!(err, AuthError::StaleRefreshToken));
    assert_ok!(fx.grants.refresh(&second).await);

    let info = assert_ok!(fx.grants.refresh_tokens().entry_info("alice", "acme").await).unwrap();
    assert_eq!(info.num_resets, 1);
}

#[tokio::test]
async fn refresh_quota_exhaustion() {
    let fx = fixture(3);

    let refresh_token = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();

    for _ in 0..3 {
        assert_ok!(fx.grants.refresh(&refresh_token).await);
    }

    let err = assert_err!(fx.grants.refresh(&refresh_token).await);
    assert!(matches!(err, AuthError::RefreshExhausted));
    assert!(
        assert_ok!(fx.grants.refresh_tokens().entry_info("alice", "acme").await).is_none()
    );

    // A new primary grant starts over
    let refresh_token = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();
    assert_ok!(fx.grants.refresh(&refresh_token).await);
}

#[tokio::test]
async fn default_quota_allows_ten_thousand_redemptions() {
    let quota = AuthConfig::default().refresh.quota;
    assert_eq!(quota, 10_000);
    let fx = fixture(quota);

    let refresh_token = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();

    for _ in 0..quota {
        assert_ok!(fx.grants.refresh(&refresh_token).await);
    }

    let info = assert_ok!(fx.grants.refresh_tokens().entry_info("alice", "acme").await).unwrap();
    assert_eq!(info.num_refresh_left, 0);

    let err = assert_err!(fx.grants.refresh(&refresh_token).await);
    assert!(matches!(err, AuthError::RefreshExhausted));
}

#[tokio::test]
async fn refresh_tokens_are_per_client() {
    let fx = fixture(10);

    let acme = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();
    let req = with_login(authorization_request("acme", "code"), "alice", "wonderland");
    let AuthorizationOutcome::Redirect(url) = assert_ok!(fx.grants.authorize(&req).await) else {
        panic!("expected redirect");
    };
    // Same pair again through another grant: resets the entry
    let code = code_from_redirect(&url);
    let via_code = assert_ok!(
        fx.grants
            .authorization_code("acme", "acme-secret", &code, REDIRECT_URI)
            .await
    )
    .refresh_token
    .unwrap();

    assert!(matches!(
        fx.grants.refresh(&acme).await,
        Err(AuthError::StaleRefreshToken)
    ));
    assert_ok!(fx.grants.refresh(&via_code).await);
}

// =============================================================================
// Session exchange
// =============================================================================

#[tokio::test]
async fn session_exchange_issues_bearer_for_session_owner() {
    let fx = fixture(10);

    let req = session_request("acme", 1, "alice-rtoken", "alice-session");
    let exchange = assert_ok!(fx.grants.session_to_bearer(&req).await);
    assert_eq!(exchange.user, "alice");
    assert!(exchange.token.refresh_token.is_none());

    let info = assert_ok!(fx.grants.token_info(&exchange.token.access_token));
    assert_eq!(info.user, "alice");
    assert_eq!(info.api_key, "acme");
    assert_eq!(info.kind, TokenKind::Access);
}

#[tokio::test]
async fn session_exchange_rejects_bad_sessions() {
    let fx = fixture(10);

    let cases = [
        session_request("acme", 1, "wrong-rtoken", "alice-session"),
        session_request("acme", 2, "alice-rtoken", "alice-session"),
        session_request("acme", 1, "alice-rtoken", "no-such-session"),
        session_request("unknown", 1, "alice-rtoken", "alice-session"),
    ];
    for req in cases {
        let err = assert_err!(fx.grants.session_to_bearer(&req).await);
        assert!(matches!(err, AuthError::LoginFailed { .. }), "{req:?}");
    }

    // Closed sessions no longer exchange
    assert!(fx.sessions.close("alice-session"));
    let req = session_request("acme", 1, "alice-rtoken", "alice-session");
    let err = assert_err!(fx.grants.session_to_bearer(&req).await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));
}

#[tokio::test]
async fn session_exchange_requires_known_user() {
    let fx = fixture(10);
    fx.sessions.open("ghost-session", UserId(42), "ghost-rtoken");

    let req = session_request("acme", 42, "ghost-rtoken", "ghost-session");
    let err = assert_err!(fx.grants.session_to_bearer(&req).await);
    assert!(matches!(err, AuthError::LoginFailed { .. }));
}

// =============================================================================
// Token info
// =============================================================================

#[tokio::test]
async fn token_info_rejects_bad_tokens() {
    let fx = fixture(10);

    let err = assert_err!(fx.grants.token_info("garbage"));
    assert!(matches!(err, AuthError::MalformedToken { .. }));

    let expired = assert_ok!(fx.codec.mint_at(
        time::OffsetDateTime::UNIX_EPOCH,
        "alice",
        "acme",
        TokenKind::Access,
        "",
        std::time::Duration::from_secs(60),
    ));
    let err = assert_err!(fx.grants.token_info(expired.as_str()));
    assert!(matches!(err, AuthError::TokenExpired));
}

#[tokio::test]
async fn token_info_describes_any_kind() {
    let fx = fixture(10);
    let refresh_token = assert_ok!(fx.grants.resource_owner("acme", "alice", "wonderland").await)
        .refresh_token
        .unwrap();

    let info = assert_ok!(fx.grants.token_info(&refresh_token));
    assert_eq!(info.kind, TokenKind::Refresh);
    assert_eq!(info.user, "alice");
}
