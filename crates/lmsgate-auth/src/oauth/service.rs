//! Grant-type state machine.
//!
//! [`GrantService`] runs the four OAuth2 flows against the host's client
//! registry, credential checks and user directory:
//!
//! - authorization endpoint (`response_type=code` and `response_type=token`)
//! - resource owner password credentials
//! - client credentials
//! - authorization code exchange
//!
//! Refresh-token redemption is delegated to [`RefreshTokenService`]. Host
//! LMS sessions can be exchanged for bearer tokens once a
//! [`SessionAuthenticator`] is attached.
//!
//! # Usage
//!
//! ```ignore
//! let service = GrantService::new(clients, identity, users, codec, refresh, &config);
//!
//! match service.authorize(&request).await? {
//!     AuthorizationOutcome::Redirect(url) => { /* 302 */ }
//!     AuthorizationOutcome::ShowLogin(prompt) => { /* render login */ }
//!     AuthorizationOutcome::ShowPermission(prompt) => { /* render consent */ }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationOutcome, AuthorizationRequest, LOGIN_FAILED_MESSAGE, LoginPrompt,
    PermissionPrompt, ResponseType, code_redirect, implicit_redirect,
};
use crate::oauth::refresh::RefreshTokenService;
use crate::oauth::session::{SessionExchange, SessionExchangeRequest};
use crate::oauth::token::{TokenGrant, TokenInfo};
use crate::storage::client::ClientRegistry;
use crate::storage::identity::IdentityAuthenticator;
use crate::storage::session::SessionAuthenticator;
use crate::storage::user::UserDirectory;
use crate::storage::with_timeout;
use crate::token::{BearerToken, TokenCodec, TokenKind};
use crate::types::GrantType;

/// Runs the OAuth2 grant flows.
pub struct GrantService {
    clients: Arc<dyn ClientRegistry>,
    identity: Arc<dyn IdentityAuthenticator>,
    users: Arc<dyn UserDirectory>,
    codec: Arc<TokenCodec>,
    refresh: Arc<RefreshTokenService>,
    sessions: Option<Arc<dyn SessionAuthenticator>>,
    storage_timeout: Duration,
}

impl GrantService {
    /// Creates a new grant service.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRegistry>,
        identity: Arc<dyn IdentityAuthenticator>,
        users: Arc<dyn UserDirectory>,
        codec: Arc<TokenCodec>,
        refresh: Arc<RefreshTokenService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            clients,
            identity,
            users,
            codec,
            refresh,
            sessions: None,
            storage_timeout: config.storage_timeout,
        }
    }

    /// Enables the session exchange against the host's sessions.
    #[must_use]
    pub fn with_session_authenticator(mut self, sessions: Arc<dyn SessionAuthenticator>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Token codec in use.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Refresh-token service in use.
    #[must_use]
    pub fn refresh_tokens(&self) -> &RefreshTokenService {
        &self.refresh
    }

    // =========================================================================
    // Authorization endpoint
    // =========================================================================

    /// Handles an authorization endpoint request.
    ///
    /// Policy checks run first and fail hard:
    /// 1. the API key must exist (`LoginFailed`)
    /// 2. `response_type` must be `code` or `token` (`ResponseType`)
    /// 3. the matching grant must be enabled (`LoginFailed`)
    ///
    /// Then, depending on what the request carries:
    /// - username and password: wrong credentials re-render the login page
    ///   with an error; otherwise consent is requested or the flow completes
    /// - an authenticity token from the permission page: the flow completes
    ///   for its subject
    /// - nothing: the login page is rendered
    ///
    /// # Errors
    ///
    /// Returns an error for failed policy checks, bad authenticity tokens,
    /// invalid redirect URIs and storage failures.
    pub async fn authorize(&self, req: &AuthorizationRequest) -> AuthResult<AuthorizationOutcome> {
        let api_key = req.api_key.as_str();

        if !self.call(self.clients.exists(api_key)).await? {
            tracing::warn!(api_key = %api_key, "Authorization request for unknown api-key");
            return Err(AuthError::login_failed("There is no client with this api-key."));
        }

        let response_type = ResponseType::parse(&req.response_type)?;
        let grant = response_type.grant_type();
        if !self.call(self.clients.is_grant_enabled(api_key, grant)).await? {
            tracing::warn!(api_key = %api_key, grant_type = %grant, "Grant type disabled");
            return Err(AuthError::login_failed(format!(
                "Grant type {grant} is disabled for this client."
            )));
        }

        if let Some((username, password)) = req.credentials() {
            if !self.call(self.identity.authenticate(username, password)).await? {
                tracing::warn!(api_key = %api_key, user = %username, "Login failed");
                return Ok(AuthorizationOutcome::ShowLogin(login_prompt(
                    req,
                    Some(LOGIN_FAILED_MESSAGE),
                )));
            }

            if self.call(self.clients.consent_required(api_key)).await? {
                let ticket = self.codec.mint(
                    username,
                    api_key,
                    TokenKind::Authenticity,
                    "",
                    self.codec.config().authenticity_token_lifetime,
                )?;
                let message = self
                    .call(self.clients.consent_text(api_key))
                    .await?
                    .unwrap_or_default();

                tracing::debug!(api_key = %api_key, user = %username, "Requesting consent");
                return Ok(AuthorizationOutcome::ShowPermission(PermissionPrompt {
                    api_key: req.api_key.clone(),
                    redirect_uri: req.redirect_uri.clone(),
                    response_type: req.response_type.clone(),
                    authenticity_token: ticket.into_string(),
                    oauth2_consent_message: message,
                }));
            }

            return self
                .complete_authorization(req, response_type, username)
                .await;
        }

        if let Some(raw) = req.authenticity_token() {
            let ticket = self.codec.parse(raw)?;
            if self.codec.is_expired(&ticket) {
                return Err(AuthError::TokenExpired);
            }
            if ticket.kind() != TokenKind::Authenticity || ticket.api_key() != api_key {
                tracing::warn!(api_key = %api_key, "Authenticity token not issued for this api-key");
                return Err(AuthError::login_failed(
                    "The authenticity token was not issued for this client.",
                ));
            }

            return self
                .complete_authorization(req, response_type, ticket.user())
                .await;
        }

        Ok(AuthorizationOutcome::ShowLogin(login_prompt(req, None)))
    }

    async fn complete_authorization(
        &self,
        req: &AuthorizationRequest,
        response_type: ResponseType,
        user: &str,
    ) -> AuthResult<AuthorizationOutcome> {
        let api_key = req.api_key.as_str();

        let url = match response_type {
            ResponseType::Code => {
                let code = self.codec.mint(
                    user,
                    api_key,
                    TokenKind::AuthorizationCode,
                    &req.redirect_uri,
                    self.codec.config().authorization_code_lifetime,
                )?;
                code_redirect(&req.redirect_uri, code.as_str())?
            }
            ResponseType::Token => {
                // No later exchange step exists for the implicit grant.
                self.ensure_user_allowed(api_key, user).await?;
                let bearer = self.codec.issue_bearer(user, api_key)?;
                implicit_redirect(&req.redirect_uri, &bearer, req.state.as_deref())?
            }
        };

        tracing::info!(
            api_key = %api_key,
            user = %user,
            response_type = %response_type,
            "Authorization granted"
        );
        Ok(AuthorizationOutcome::Redirect(url))
    }

    // =========================================================================
    // Token endpoint
    // =========================================================================

    /// Dispatches a token endpoint request to its grant.
    ///
    /// # Errors
    ///
    /// See the individual grant methods.
    pub async fn exchange(&self, grant: TokenGrant) -> AuthResult<BearerToken> {
        match grant {
            TokenGrant::Password {
                api_key,
                username,
                password,
            } => self.resource_owner(&api_key, &username, &password).await,
            TokenGrant::ClientCredentials {
                api_key,
                api_secret,
            } => self.client_credentials(&api_key, &api_secret).await,
            TokenGrant::AuthorizationCode {
                api_key,
                api_secret,
                code,
                redirect_uri,
            } => {
                self.authorization_code(&api_key, &api_secret, &code, &redirect_uri)
                    .await
            }
            TokenGrant::RefreshToken { refresh_token } => self.refresh(&refresh_token).await,
        }
    }

    /// Resource owner password credentials grant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginFailed` if the credentials are wrong, the
    /// API key is unknown, the grant is disabled or the user is not allowed.
    pub async fn resource_owner(
        &self,
        api_key: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<BearerToken> {
        if !self.call(self.identity.authenticate(username, password)).await? {
            tracing::warn!(api_key = %api_key, user = %username, "Login failed");
            return Err(AuthError::login_failed("Username or password incorrect."));
        }

        self.ensure_grant(api_key, GrantType::ResourceOwner).await?;
        self.ensure_user_allowed(api_key, username).await?;

        let bearer = self.codec.issue_bearer(username, api_key)?;
        let bearer = self
            .attach_refresh_token(bearer, username, api_key, GrantType::ResourceOwner)
            .await?;

        tracing::info!(api_key = %api_key, user = %username, grant_type = "password", "Issued bearer token");
        Ok(bearer)
    }

    /// Client credentials grant. Tokens are issued for the API key's
    /// service-account user and never carry a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginFailed` if the API key is unknown, the grant
    /// is disabled, the secret is wrong or the service account cannot be
    /// resolved.
    pub async fn client_credentials(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> AuthResult<BearerToken> {
        self.ensure_grant(api_key, GrantType::ClientCredentials)
            .await?;
        self.ensure_client_secret(api_key, api_secret).await?;

        let user_id = self
            .call(self.clients.service_account_user(api_key))
            .await?
            .ok_or_else(|| AuthError::login_failed("No service account configured."))?;
        let user = self
            .call(self.users.id_to_login(user_id))
            .await?
            .ok_or_else(|| AuthError::login_failed("Service account user does not exist."))?;

        let bearer = self.codec.issue_bearer(&user, api_key)?;

        tracing::info!(api_key = %api_key, user = %user, grant_type = "client_credentials", "Issued bearer token");
        Ok(bearer)
    }

    /// Authorization code exchange.
    ///
    /// The API secret is checked before the code is looked at. The code must
    /// be valid, unexpired, and carry the same API key and redirect URI as
    /// the request.
    ///
    /// # Errors
    ///
    /// - `AuthError::LoginFailed` for a wrong secret, a mismatching code,
    ///   a disabled grant or a user that is not allowed
    /// - token errors for malformed, expired or wrong-kind codes
    pub async fn authorization_code(
        &self,
        api_key: &str,
        api_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> AuthResult<BearerToken> {
        self.ensure_client_secret(api_key, api_secret).await?;

        let code = self.codec.validate(code, TokenKind::AuthorizationCode)?;
        if code.misc() != redirect_uri || code.api_key() != api_key {
            tracing::warn!(api_key = %api_key, "Authorization code presented by another client or for another redirect_uri");
            return Err(AuthError::login_failed(
                "Authorization code does not match the request.",
            ));
        }

        let user = code.user();
        self.ensure_grant(api_key, GrantType::AuthorizationCode)
            .await?;
        self.ensure_user_allowed(api_key, user).await?;

        let bearer = self.codec.issue_bearer(user, api_key)?;
        let bearer = self
            .attach_refresh_token(bearer, user, api_key, GrantType::AuthorizationCode)
            .await?;

        tracing::info!(api_key = %api_key, user = %user, grant_type = "authorization_code", "Issued bearer token");
        Ok(bearer)
    }

    /// Refresh token grant.
    ///
    /// # Errors
    ///
    /// See [`RefreshTokenService::redeem`].
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<BearerToken> {
        self.refresh.redeem(refresh_token).await
    }

    /// Exchanges a host LMS session for a bearer token of `api_key`.
    ///
    /// No refresh token is attached.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginFailed` if no session authenticator is
    /// attached, the API key is unknown, the session is not valid for the
    /// user or the user does not exist.
    pub async fn session_to_bearer(
        &self,
        req: &SessionExchangeRequest,
    ) -> AuthResult<SessionExchange> {
        let Some(sessions) = &self.sessions else {
            return Err(AuthError::login_failed("Session exchange is not enabled."));
        };

        if !self.call(self.clients.exists(&req.api_key)).await? {
            tracing::warn!(api_key = %req.api_key, "Unknown api-key");
            return Err(AuthError::login_failed("There is no client with this api-key."));
        }

        if !self
            .call(sessions.authenticate_session(req.user_id, &req.rtoken, &req.session_id))
            .await?
        {
            tracing::warn!(api_key = %req.api_key, user_id = %req.user_id, "Session rejected");
            return Err(AuthError::login_failed("Invalid token."));
        }

        let user = self
            .call(self.users.id_to_login(req.user_id))
            .await?
            .ok_or_else(|| AuthError::login_failed("Invalid token."))?;
        let token = self.codec.issue_bearer(&user, &req.api_key)?;

        tracing::info!(api_key = %req.api_key, user = %user, grant_type = "session", "Issued bearer token");
        Ok(SessionExchange { user, token })
    }

    /// Describes a token of any kind.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` or `AuthError::TokenExpired`.
    pub fn token_info(&self, raw: &str) -> AuthResult<TokenInfo> {
        let token = self.codec.parse(raw)?;
        if self.codec.is_expired(&token) {
            return Err(AuthError::TokenExpired);
        }

        Ok(TokenInfo {
            api_key: token.api_key().to_string(),
            user: token.user().to_string(),
            kind: token.kind(),
            expires_in: self.codec.remaining_time(&token).as_secs(),
        })
    }

    /// Validates a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns a token error if the token is malformed, expired or not an
    /// access token.
    pub fn authenticate_bearer(&self, raw: &str) -> AuthResult<crate::token::Token> {
        self.codec.validate(raw, TokenKind::Access)
    }

    // =========================================================================
    // Policy helpers
    // =========================================================================

    async fn ensure_grant(&self, api_key: &str, grant: GrantType) -> AuthResult<()> {
        if !self.call(self.clients.exists(api_key)).await? {
            tracing::warn!(api_key = %api_key, grant_type = %grant, "Unknown api-key");
            return Err(AuthError::login_failed("There is no client with this api-key."));
        }
        if !self.call(self.clients.is_grant_enabled(api_key, grant)).await? {
            tracing::warn!(api_key = %api_key, grant_type = %grant, "Grant type disabled");
            return Err(AuthError::login_failed(format!(
                "Grant type {grant} is disabled for this client."
            )));
        }
        Ok(())
    }

    async fn ensure_client_secret(&self, api_key: &str, api_secret: &str) -> AuthResult<()> {
        if !self
            .call(self.identity.check_client_secret(api_key, api_secret))
            .await?
        {
            tracing::warn!(api_key = %api_key, "Client secret rejected");
            return Err(AuthError::login_failed("Client credentials incorrect."));
        }
        Ok(())
    }

    async fn ensure_user_allowed(&self, api_key: &str, login: &str) -> AuthResult<()> {
        let allowed = self.call(self.clients.allowed_users(api_key)).await?;
        let user_id = self.call(self.users.login_to_id(login)).await?;

        if !user_id.is_some_and(|id| allowed.permits(id)) {
            tracing::warn!(api_key = %api_key, user = %login, "User not allowed for api-key");
            return Err(AuthError::login_failed(
                "User is not allowed to use this api-key.",
            ));
        }
        Ok(())
    }

    async fn attach_refresh_token(
        &self,
        bearer: BearerToken,
        user: &str,
        api_key: &str,
        grant: GrantType,
    ) -> AuthResult<BearerToken> {
        if !self.call(self.clients.refresh_enabled_for(api_key, grant)).await? {
            return Ok(bearer);
        }
        let refresh_token = self.refresh.issue(user, api_key).await?;
        Ok(bearer.with_refresh_token(refresh_token))
    }

    async fn call<T>(&self, operation: impl Future<Output = AuthResult<T>>) -> AuthResult<T> {
        with_timeout(self.storage_timeout, operation).await
    }
}

fn login_prompt(req: &AuthorizationRequest, error_msg: Option<&str>) -> LoginPrompt {
    LoginPrompt {
        error_msg: error_msg.map(str::to_string),
        api_key: req.api_key.clone(),
        redirect_uri: req.redirect_uri.clone(),
        response_type: req.response_type.clone(),
    }
}
