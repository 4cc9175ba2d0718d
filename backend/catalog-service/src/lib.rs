/// Catalog Service Library
///
/// gRPC service for creating, searching, rating and illustrating catalog
/// records, gated by JWT role checks.
///
/// ## Modules
///
/// - `app`: shared state and router assembly
/// - `client`: token-refreshing client session
/// - `config`: service and client configuration
/// - `context`: per-call deadline and cancellation
/// - `error`: error types
/// - `grpc`: message types and service implementations
/// - `policy`: method to role mapping
/// - `security`: password hashing and JWT re-exports
/// - `store`: in-memory record, rating and user stores, disk image store
pub mod app;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod grpc;
pub mod policy;
pub mod security;
pub mod store;

// Re-export commonly used types
pub use app::{build_router, AppState};
pub use error::{CatalogError, Result};
pub use grpc::{AuthServiceImpl, RecordServiceImpl};
