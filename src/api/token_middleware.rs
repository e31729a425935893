//! Credential-injection middleware and context carrier.
//!
//! Wraps downstream handlers: resolves the request's lookup key to stored
//! credentials and injects them into the request extensions, or redirects
//! the caller into the authorization flow on a miss.

use super::oauth::{found, AppError};
use crate::auth::{Credentials, TokenStore};
use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Query parameters for lookup key selection
#[derive(Deserialize)]
pub(crate) struct ApiKeyQuery {
    apikey: Option<String>,
}

/// Shared state for the credential-injection layer
#[derive(Clone)]
pub struct TokenLayerState {
    pub token_store: Arc<dyn TokenStore>,
    /// Key used when the request carries no ?apikey=
    pub default_key: String,
    /// Login endpoint a credential miss redirects to
    pub login_path: String,
}

/// Request-scoped slot holding the resolved credentials.
///
/// Written once by [`require_token`], read by downstream handlers through
/// the `FromRequestParts` impl. Keyed by type identity in the request
/// extensions, so it cannot collide with other request-scoped values.
#[derive(Clone)]
pub struct CurrentToken(pub Credentials);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    /// A missing slot after passing the middleware is a contract violation;
    /// it surfaces as a 401 "credential not found", never a panic.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentToken>()
            .cloned()
            .ok_or(AppError::CredentialNotFound)
    }
}

/// Credential-injection middleware.
///
/// Runs as a tower layer in front of the wrapped handlers:
/// 1. Resolve the lookup key: ?apikey= when present, else the default key
/// 2. Store hit → inject [`CurrentToken`] and run the handler
/// 3. Store miss → 302 to the login endpoint; the handler never runs
pub async fn require_token(
    State(state): State<TokenLayerState>,
    Query(params): Query<ApiKeyQuery>,
    mut req: Request,
    next: Next,
) -> Response {
    let key = params.apikey.as_deref().unwrap_or(&state.default_key);

    match state.token_store.get(key) {
        Some(credentials) => {
            req.extensions_mut().insert(CurrentToken(credentials));
            next.run(req).await
        }
        None => {
            debug!(key = %key, "no stored credentials, redirecting to login");
            found(&state.login_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryTokenStore;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn credentials(token: &str) -> Credentials {
        Credentials {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    async fn whoami(CurrentToken(creds): CurrentToken) -> String {
        creds.access_token
    }

    fn create_test_app(store: Arc<InMemoryTokenStore>) -> Router {
        let state = TokenLayerState {
            token_store: store,
            default_key: ":default-key:".to_string(),
            login_path: "/auth/login".to_string(),
        };
        Router::new()
            .route("/api/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(state, require_token))
    }

    #[tokio::test]
    async fn test_default_key_hit_injects_credentials() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.set(":default-key:", credentials("access_default"));
        let app = create_test_app(store);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"access_default");
    }

    #[tokio::test]
    async fn test_apikey_query_selects_key() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.set("alice-key", credentials("access_alice"));
        let app = create_test_app(store);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/whoami?apikey=alice-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"access_alice");
    }

    #[tokio::test]
    async fn test_miss_redirects_to_login() {
        let store = Arc::new(InMemoryTokenStore::new());
        let app = create_test_app(store);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login"
        );
    }

    #[tokio::test]
    async fn test_read_without_injection_is_unauthorized() {
        // Route without the middleware layer: the carrier is empty, the
        // extractor surfaces the contract violation as 401
        let app = Router::new().route("/api/whoami", get(whoami));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
