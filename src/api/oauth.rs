//! Authorization controller: login redirect and callback exchange.
//!
//! Drives the authorization-code flow:
//! 1. GET /auth/login → 302 to the provider consent page
//! 2. User authorizes on the provider's site
//! 3. Provider redirects to GET /auth/callback with code and echoed state
//! 4. Callback gates in order: state check → code exchange → key generation
//!    → store write → 302 to the default destination
//!
//! Each gate is terminal on failure; the client restarts at /auth/login.

use crate::auth::{
    exchange_code_for_token, CorrelationGuard, KeyGenerator, ProviderConfig, TokenStore,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Error response for non-diagnostic failures
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Diagnostic payload for rejected callbacks.
///
/// Echoes the request's scope, headers, and query for debugging, with
/// secrets redacted: the `code` parameter and `authorization`/`cookie`
/// headers never appear.
#[derive(Serialize, Debug)]
pub struct Diagnostic {
    pub error: String,
    pub scope: String,
    pub header: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
}

impl Diagnostic {
    fn new(error: String, headers: &HeaderMap, query: &BTreeMap<String, String>) -> Self {
        let header = headers
            .iter()
            .filter(|(name, _)| *name != header::AUTHORIZATION && *name != header::COOKIE)
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or("<non-ascii>").to_string();
                (name.to_string(), value)
            })
            .collect();
        let scope = query.get("scope").cloned().unwrap_or_default();
        let query = query
            .iter()
            .filter(|(key, _)| key.as_str() != "code")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            error,
            scope,
            header,
            query,
        }
    }
}

/// Application error types for the delegation core
pub enum AppError {
    /// Callback state does not match any live login attempt (forged or stale)
    InvalidState(Diagnostic),
    /// Provider rejected the code, or the exchange request failed
    ExchangeFailed(Diagnostic),
    /// Lookup key generation failed (operator-facing)
    KeyGenerationFailed(String),
    /// Context carrier read without a prior injection (contract violation)
    CredentialNotFound,
    /// Downstream resource API failure
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidState(diag) | AppError::ExchangeFailed(diag) => {
                (StatusCode::UNAUTHORIZED, Json(diag)).into_response()
            }
            AppError::KeyGenerationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: msg }),
            )
                .into_response(),
            AppError::CredentialNotFound => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "credential not found".to_string(),
                }),
            )
                .into_response(),
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse { error: msg }),
            )
                .into_response(),
        }
    }
}

/// 302 Found redirect (axum's `Redirect::temporary` answers 307, the flow
/// requires 302)
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Shared application state for the authorization controller
#[derive(Clone)]
pub struct OauthAppState {
    pub token_store: Arc<dyn TokenStore>,
    pub key_generator: Arc<dyn KeyGenerator>,
    pub correlation: CorrelationGuard,
    pub http: reqwest::Client,
    pub provider: ProviderConfig,
    /// Callback URL registered with the provider
    pub redirect_uri: String,
    /// Where successful logins land
    pub default_url: String,
    /// Append ?key=<LookupKey> to the success redirect
    pub append_key: bool,
    /// Salt prepended by the random key generator
    pub salt: String,
}

impl OauthAppState {
    fn redirect_destination(&self, key: &str) -> String {
        if !self.append_key {
            return self.default_url.clone();
        }
        let separator = if self.default_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}key={}",
            self.default_url,
            separator,
            urlencoding::encode(key)
        )
    }
}

/// Create the authorization controller router
pub fn create_auth_router(state: OauthAppState) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .with_state(Arc::new(state))
}

/// GET /auth/login
///
/// Starts a login attempt: issues a correlation state and redirects the
/// caller to the provider consent page. Nothing is durably persisted beyond
/// the state itself.
async fn login(State(state): State<Arc<OauthAppState>>) -> Response {
    let correlation = state.correlation.issue();
    let auth_url = state.provider.build_auth_url(&correlation, &state.redirect_uri);

    info!("Redirecting to OAuth provider consent page");
    found(&auth_url)
}

/// GET /auth/callback?state=&code=&scope=
///
/// Completes a login attempt. Gates in order, each terminal on failure:
/// state verification (401), code exchange (401), key generation (500),
/// store write, then 302 to the default destination.
///
/// # Security
/// - Single-use state in per-attempt mode (consumed on verification)
/// - Exactly one store write on success, none on failure
/// - Diagnostics never echo the code, the credential, or auth headers
async fn callback(
    State(state): State<Arc<OauthAppState>>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    debug!("OAuth callback received");

    // Provider-reported authorization failure (user denied, bad request, ...)
    if let Some(provider_error) = query.get("error") {
        warn!(error = %provider_error, "OAuth authorization failed at the provider");
        return Err(AppError::ExchangeFailed(Diagnostic::new(
            format!("authorization failed: {}", provider_error),
            &headers,
            &query,
        )));
    }

    // Gate 1: the echoed state must belong to a live attempt
    let echoed_state = query.get("state").map(String::as_str).unwrap_or_default();
    if !state.correlation.verify_and_consume(echoed_state) {
        warn!("Invalid or expired OAuth state");
        return Err(AppError::InvalidState(Diagnostic::new(
            "invalid state".to_string(),
            &headers,
            &query,
        )));
    }

    // Gate 2: exchange the code for credentials. Runs under the client's
    // bounded timeout; if the request is cancelled first, no write happens.
    let code = query.get("code").map(String::as_str).unwrap_or_default();
    let credentials = exchange_code_for_token(
        &state.http,
        &state.provider.token_url,
        code,
        &state.redirect_uri,
        &state.provider.client_id,
        &state.provider.client_secret,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Token exchange failed");
        AppError::ExchangeFailed(Diagnostic::new(
            format!("invalid code: {}", e),
            &headers,
            &query,
        ))
    })?;

    // Gate 3: the key must be known before the store write
    let key = state
        .key_generator
        .generate(&credentials, &state.salt)
        .map_err(|e| {
            error!(error = %e, "Lookup key generation failed");
            AppError::KeyGenerationFailed(format!("key generation failed: {}", e))
        })?;

    // Gate 4: the single store write of the flow
    state.token_store.set(&key, credentials);

    let destination = state.redirect_destination(&key);
    info!(key = %key, "OAuth flow completed, credentials stored");
    Ok(found(&destination))
}
