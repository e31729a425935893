//! OAuth 2.0 delegation core.
//!
//! Implements the pieces that make delegated access reusable across requests:
//! 1. User hits GET /auth/login → Redirect to provider consent page
//! 2. User authorizes on the provider's site
//! 3. Provider redirects to /auth/callback with a code and the echoed state
//! 4. Callback validates the state, exchanges the code for credentials
//! 5. Credentials are stored under a generated lookup key
//! 6. Subsequent requests carrying that key resolve the credentials through
//!    the token middleware

mod correlation;
mod exchange;
mod keygen;
mod provider;
mod token_store;

pub use correlation::{run_attempt_cleanup, AttemptRegistry, CorrelationGuard};
pub use exchange::exchange_code_for_token;
pub use keygen::{ConstantKeyGenerator, KeyGenerator, RandomKeyGenerator};
pub use provider::ProviderConfig;
pub use token_store::{InMemoryTokenStore, TokenStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials for accessing the downstream resource API on the user's
/// behalf.
///
/// Issued by the provider's token endpoint and immutable once issued:
/// re-authorization replaces the stored value wholesale, it is never mutated
/// in place.
///
/// # Security
/// - Never log token values; log lookup keys only
/// - Never echo credentials in diagnostic responses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth access token (used for resource API requests)
    pub access_token: String,

    /// OAuth refresh token (used to obtain new access tokens)
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    pub expires_at: Option<DateTime<Utc>>,
}
