//! JWT issue and validation for catalog services
//!
//! Tokens are self-contained: the subject (username), role and expiry travel
//! inside the token and are proven by an HS256 signature over a shared secret.
//! The manager keeps no per-token state, so any process holding the same
//! secret can validate a token minted by another.
//!
//! ## Security Design
//!
//! - **HS256 ONLY**: tokens signed with any other algorithm are rejected
//! - **Zero leeway**: a token is invalid as soon as `now > exp`
//! - **No empty secrets**: construction fails instead of signing with an empty key
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Duration;
//! use crypto_core::jwt::JwtManager;
//!
//! let manager = JwtManager::new("secret", Duration::minutes(15)).unwrap();
//! let token = manager.generate("admin", "admin").unwrap();
//! let claims = manager.validate(&token).unwrap();
//! assert_eq!(claims.role, "admin");
//! ```
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - every catalog token is HS256
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role of the subject, e.g. "admin" or "user"
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("signing key misconfigured: {0}")]
    KeyMisconfigured(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

// ============================================================================
// Manager
// ============================================================================

/// Issues and validates HS256 tokens with a fixed lifetime
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl JwtManager {
    /// Create a manager from a shared secret and a token lifetime
    ///
    /// ## Errors
    ///
    /// Returns `JwtError::KeyMisconfigured` if the secret is empty.
    pub fn new(secret: &str, token_duration: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::KeyMisconfigured(
                "JWT secret must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_duration,
        })
    }

    /// Lifetime applied to every generated token
    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Generate a token for `username` carrying `role`
    ///
    /// The token expires `token_duration` after issue.
    pub fn generate(&self, username: &str, role: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiry = now + self.token_duration;

        let claims = Claims {
            sub: username.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Validate a token and return its claims
    ///
    /// ## Errors
    ///
    /// Returns `JwtError::InvalidToken` if:
    /// - Token was signed with an algorithm other than HS256
    /// - Signature does not match the shared secret
    /// - Token is expired
    /// - Token format is malformed
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                JwtError::InvalidToken(e.to_string())
            })
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("algorithm", &JWT_ALGORITHM)
            .field("token_duration", &self.token_duration)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
