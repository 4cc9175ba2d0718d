//! Shared cryptographic primitives for catalog services.
//!
//! - `jwt`: HS256 token issue and verification

pub mod jwt;

pub use jwt::{Claims, JwtError, JwtManager};
