//! Request Extension Trait for JWT Claims Access
//!
//! Provides helpers for reading the claims that [`crate::JwtServerLayer`]
//! stored on an authorized request.

use crate::JwtClaims;
use tonic::{Request, Status};

/// Extension trait for accessing JWT claims from gRPC requests
///
/// Claims are only present on calls to protected methods; public methods
/// reach handlers without them.
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_jwt_propagation::JwtClaimsExt;
/// use tonic::{Request, Response, Status};
///
/// async fn create(request: Request<()>) -> Result<Response<()>, Status> {
///     let claims = request.require_role(&["admin"])?;
///     tracing::info!(username = %claims.username, "creating");
///     Ok(Response::new(()))
/// }
/// ```
pub trait JwtClaimsExt {
    /// Claims stored by the server layer
    ///
    /// ## Errors
    ///
    /// `Status::unauthenticated` if the request carries no claims.
    fn jwt_claims(&self) -> Result<&JwtClaims, Status>;

    /// Claims, provided the caller's role is one of `roles`
    ///
    /// ## Errors
    ///
    /// - `Status::unauthenticated` if no claims were stored
    /// - `Status::permission_denied` if the role does not match
    fn require_role(&self, roles: &[&str]) -> Result<&JwtClaims, Status>;
}

impl<T> JwtClaimsExt for Request<T> {
    fn jwt_claims(&self) -> Result<&JwtClaims, Status> {
        self.extensions()
            .get::<JwtClaims>()
            .ok_or_else(|| Status::unauthenticated("auth token is not provided"))
    }

    fn require_role(&self, roles: &[&str]) -> Result<&JwtClaims, Status> {
        let claims = self.jwt_claims()?;

        if !claims.has_any_role(roles) {
            return Err(Status::permission_denied(
                "no permission to access this RPC",
            ));
        }

        Ok(claims)
    }
}
