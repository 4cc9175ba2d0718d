/// Security primitives for catalog-service
///
/// - Password hashing and verification (Argon2id)
/// - JWT issuing and validation (HS256 via crypto-core)
pub use crypto_core::{Claims, JwtError, JwtManager};

pub mod password;

pub use password::{hash_password, verify_password};
