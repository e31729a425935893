//! Lookup key generation.
//!
//! Produces the opaque key a freshly exchanged credential is stored under.
//! Invoked exactly once per successful callback, after the token exchange
//! succeeds and before the store write.

use super::Credentials;
use anyhow::Result;
use uuid::Uuid;

/// Strategy for producing a credential's lookup key.
///
/// The credential is available at generation time so a derived-key strategy
/// can be added without changing the callback path.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, credentials: &Credentials, salt: &str) -> Result<String>;
}

/// Always returns a fixed configured key.
///
/// For single-user deployments where exactly one credential is ever stored;
/// each login overwrites the previous entry.
pub struct ConstantKeyGenerator {
    pub key: String,
}

impl KeyGenerator for ConstantKeyGenerator {
    fn generate(&self, _credentials: &Credentials, _salt: &str) -> Result<String> {
        Ok(self.key.clone())
    }
}

/// Returns `salt + uuid-v4` per login.
///
/// 128-bit random component, so collisions are negligible.
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, _credentials: &Credentials, salt: &str) -> Result<String> {
        Ok(format!("{}{}", salt, Uuid::new_v4()))
    }
}
