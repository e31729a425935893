// OAuth2 delegation core: token store, key generation, correlation guard
pub mod auth;

// HTTP API: authorization controller, credential middleware, task handlers
pub mod api;

// TOML configuration with env-var secret overrides
pub mod config;
