use serde::Deserialize;

/// Complete taskgate configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TaskgateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub oauth: OauthConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Externally reachable base URL; /auth/callback is appended to form the
    /// redirect URI registered with the provider
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8888".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
        }
    }
}

/// OAuth provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OauthConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Usually supplied via TASKGATE_OAUTH_CLIENT_ID
    #[serde(default)]
    pub client_id: String,
    /// Usually supplied via TASKGATE_OAUTH_CLIENT_SECRET
    #[serde(default)]
    pub client_secret: String,
    /// Bound on the token exchange request
    #[serde(default = "default_exchange_timeout")]
    pub exchange_timeout_seconds: u64,
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/tasks".to_string()]
}

fn default_exchange_timeout() -> u64 {
    10
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            client_id: String::new(),
            client_secret: String::new(),
            exchange_timeout_seconds: default_exchange_timeout(),
        }
    }
}

/// Delegation core configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lookup key used when a request carries no ?apikey=
    #[serde(default = "default_key")]
    pub default_key: String,
    /// Salt prepended by the random key generator
    #[serde(default)]
    pub salt: String,
    /// "random" (salt + uuid per login) or "constant" (always default_key)
    #[serde(default = "default_key_strategy")]
    pub key_strategy: String,
    /// Where successful logins land
    #[serde(default = "default_url")]
    pub default_url: String,
    /// Append ?key=<LookupKey> to the success redirect
    #[serde(default = "default_append_key")]
    pub append_key: bool,
    /// "per-attempt" (random single-use state) or "shared-secret"
    /// (low-security: one replayable value for every login)
    #[serde(default = "default_state_mode")]
    pub state_mode: String,
    /// Required when state_mode = "shared-secret"
    #[serde(default)]
    pub shared_secret: String,
    /// How long an issued state remains valid
    #[serde(default = "default_state_expiry")]
    pub state_expiry_seconds: i64,
    /// How often expired login attempts are swept
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_key() -> String {
    ":default-key:".to_string()
}

fn default_key_strategy() -> String {
    "random".to_string()
}

fn default_url() -> String {
    "http://localhost:8888/api/tasklist".to_string()
}

fn default_append_key() -> bool {
    true
}

fn default_state_mode() -> String {
    "per-attempt".to_string()
}

fn default_state_expiry() -> i64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            default_key: default_key(),
            salt: String::new(),
            key_strategy: default_key_strategy(),
            default_url: default_url(),
            append_key: default_append_key(),
            state_mode: default_state_mode(),
            shared_secret: String::new(),
            state_expiry_seconds: default_state_expiry(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// Downstream resource API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_tasks_base_url")]
    pub base_url: String,
}

fn default_tasks_base_url() -> String {
    "https://tasks.googleapis.com/tasks/v1".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            base_url: default_tasks_base_url(),
        }
    }
}

impl Default for TaskgateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            oauth: OauthConfig::default(),
            auth: AuthConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

impl TaskgateConfig {
    /// Overlay OAuth client credentials from the environment.
    ///
    /// Secrets belong in env vars, not config files.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("TASKGATE_OAUTH_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("TASKGATE_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }
    }

    /// Reject configurations that cannot complete a login flow
    pub fn validate(&self) -> Result<(), String> {
        if self.oauth.client_id.is_empty() {
            return Err(
                "oauth.client_id is required (set TASKGATE_OAUTH_CLIENT_ID)".to_string(),
            );
        }
        if self.oauth.client_secret.is_empty() {
            return Err(
                "oauth.client_secret is required (set TASKGATE_OAUTH_CLIENT_SECRET)".to_string(),
            );
        }
        match self.auth.key_strategy.as_str() {
            "random" | "constant" => {}
            other => return Err(format!("unknown auth.key_strategy: {:?}", other)),
        }
        match self.auth.state_mode.as_str() {
            "per-attempt" => {}
            "shared-secret" => {
                if self.auth.shared_secret.is_empty() {
                    return Err(
                        "auth.shared_secret is required when state_mode = \"shared-secret\""
                            .to_string(),
                    );
                }
            }
            other => return Err(format!("unknown auth.state_mode: {:?}", other)),
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<TaskgateConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: TaskgateConfig = toml::from_str(&contents)?;
    Ok(config)
}
