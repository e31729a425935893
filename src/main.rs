use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use taskgate::api::{
    create_auth_router, create_tasks_router, OauthAppState, TasksAppState, TokenLayerState,
};
use taskgate::auth::{
    run_attempt_cleanup, AttemptRegistry, ConstantKeyGenerator, CorrelationGuard,
    InMemoryTokenStore, KeyGenerator, ProviderConfig, RandomKeyGenerator, TokenStore,
};
use taskgate::config::{load_config, TaskgateConfig};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskgate=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "taskgate.toml".to_string());
    let mut config = if std::path::Path::new(&config_path).exists() {
        load_config(&config_path)
            .map_err(|e| anyhow!("failed to load config {}: {}", config_path, e))?
    } else {
        info!("config file {} not found, using defaults", config_path);
        TaskgateConfig::default()
    };
    config.apply_env_overrides();
    config.validate().map_err(|e| anyhow!(e))?;

    run(config).await
}

async fn run(config: TaskgateConfig) -> Result<()> {
    // The only shared mutable state: the token store, owned here and handed
    // to controller and middleware by reference
    let token_store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());

    let key_generator: Arc<dyn KeyGenerator> = match config.auth.key_strategy.as_str() {
        "constant" => Arc::new(ConstantKeyGenerator {
            key: config.auth.default_key.clone(),
        }),
        "random" => Arc::new(RandomKeyGenerator),
        other => bail!("unknown key_strategy: {:?}", other),
    };

    let correlation = match config.auth.state_mode.as_str() {
        "per-attempt" => {
            let registry = AttemptRegistry::new(config.auth.state_expiry_seconds);
            tokio::spawn(run_attempt_cleanup(
                registry.clone(),
                config.auth.cleanup_interval_seconds,
            ));
            CorrelationGuard::PerAttempt(registry)
        }
        "shared-secret" => {
            warn!("shared-secret correlation mode: callbacks are replayable across logins");
            CorrelationGuard::SharedSecret(config.auth.shared_secret.clone())
        }
        other => bail!("unknown state_mode: {:?}", other),
    };

    // One client for the token exchange and the resource API, with the
    // exchange's bounded timeout
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(
            config.oauth.exchange_timeout_seconds,
        ))
        .build()
        .context("failed to build HTTP client")?;

    let oauth_state = OauthAppState {
        token_store: Arc::clone(&token_store),
        key_generator,
        correlation,
        http: http.clone(),
        provider: ProviderConfig {
            auth_url: config.oauth.auth_url.clone(),
            token_url: config.oauth.token_url.clone(),
            scopes: config.oauth.scopes.clone(),
            client_id: config.oauth.client_id.clone(),
            client_secret: config.oauth.client_secret.clone(),
        },
        redirect_uri: format!("{}/auth/callback", config.server.public_url),
        default_url: config.auth.default_url.clone(),
        append_key: config.auth.append_key,
        salt: config.auth.salt.clone(),
    };

    let layer_state = TokenLayerState {
        token_store,
        default_key: config.auth.default_key.clone(),
        login_path: "/auth/login".to_string(),
    };

    let tasks_state = TasksAppState {
        http,
        base_url: config.tasks.base_url.clone(),
    };

    let app = axum::Router::new()
        .merge(create_auth_router(oauth_state))
        .merge(create_tasks_router(tasks_state, layer_state))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!("taskgate listening on {}", config.server.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
