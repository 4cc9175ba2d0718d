//! JWT Claims Structure and Authorization Helpers
//!
//! This module defines the JwtClaims structure that is extracted from validated tokens
//! and stored in request extensions for access by service handlers.

use serde::{Deserialize, Serialize};

/// JWT Claims extracted from validated tokens
///
/// Derived from crypto-core's `Claims` once the signature and expiry have
/// been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Username (the `sub` claim)
    pub username: String,

    /// Role the token was issued for
    pub role: String,

    /// Issued at timestamp (Unix timestamp)
    pub iat: i64,

    /// Expiration timestamp (Unix timestamp)
    pub exp: i64,
}

impl JwtClaims {
    /// Create JwtClaims from crypto-core's validated Claims
    pub fn from_validated_claims(claims: &crypto_core::Claims) -> Self {
        Self {
            username: claims.sub.clone(),
            role: claims.role.clone(),
            iat: claims.iat,
            exp: claims.exp,
        }
    }

    /// Check whether the token role is one of `roles`
    ///
    /// Comparison is exact and case-sensitive.
    pub fn has_any_role<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        roles.iter().any(|role| role.as_ref() == self.role)
    }
}
