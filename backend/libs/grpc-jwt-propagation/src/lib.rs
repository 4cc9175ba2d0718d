//! JWT Authentication for gRPC Services
//!
//! Server-side role enforcement and client-side token injection built on
//! the HS256 [`crypto_core::JwtManager`].
//!
//! ## Core Components
//!
//! - **AccessPolicy**: which roles may call which method; unlisted methods are public
//! - **JwtServerLayer**: tower layer validating tokens against the policy
//! - **JwtClientInterceptor**: attaches the current token to protected calls
//! - **TokenRefresher**: logs in again on a fixed interval in the background
//! - **JwtClaimsExt**: request extension trait for reading validated claims
//!
//! ## Usage Example
//!
//! ### Server Side
//!
//! ```rust,no_run
//! use crypto_core::JwtManager;
//! use grpc_jwt_propagation::{AccessPolicy, JwtServerLayer};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let jwt = Arc::new(JwtManager::new("secret", chrono::Duration::minutes(15))?);
//! let policy = AccessPolicy::new()
//!     .allow("/catalog.v1.RecordService/CreateRecord", ["admin"])
//!     .allow("/catalog.v1.RecordService/RateRecords", ["admin", "user"]);
//!
//! let _server = tonic::transport::Server::builder()
//!     .layer(JwtServerLayer::new(jwt, Arc::new(policy)));
//! # Ok(())
//! # }
//! ```
//!
//! ### Client Side
//!
//! ```rust,no_run
//! use grpc_jwt_propagation::{AccessPolicy, RefreshConfig, TokenRefresher, TokenSource};
//! use std::sync::Arc;
//!
//! # async fn example(source: Arc<dyn TokenSource>, policy: AccessPolicy) -> Result<(), tonic::Status> {
//! let refresher = TokenRefresher::start(source, RefreshConfig::default()).await?;
//! let _interceptor = refresher.interceptor(policy.protected_methods());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Guarantees
//!
//! - Tokens are validated with HS256 only; expiry is checked with no leeway
//! - No token = `Status::unauthenticated`
//! - Invalid or expired token = `Status::unauthenticated`
//! - Role not allowed = `Status::permission_denied`

mod claims;
mod client;
mod extensions;
mod policy;
mod server;

pub use claims::JwtClaims;
pub use client::{JwtClientInterceptor, RefreshConfig, TokenRefresher, TokenSource};
pub use extensions::JwtClaimsExt;
pub use policy::AccessPolicy;
pub use server::{Decision, JwtServerLayer, JwtServerService};

// Re-export tonic Status for convenience
pub use tonic::Status;
