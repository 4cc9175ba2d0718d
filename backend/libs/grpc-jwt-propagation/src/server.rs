//! Server-side JWT authorization layer
//!
//! A tower layer placed in front of every tonic service. It sees the HTTP/2
//! request that opens each call, so unary calls and both streaming directions
//! are authorized the same way and exactly once per call.

use crate::claims::JwtClaims;
use crate::policy::AccessPolicy;
use crypto_core::JwtManager;
use futures::future::BoxFuture;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};
use tracing::{info, warn};

const AUTHORIZATION_HEADER: &str = "authorization";

/// Outcome of a successful authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Method has no policy entry; no token was looked at
    Public,
    /// Token was valid and its role is allowed for the method
    Authorized(JwtClaims),
}

/// Tower layer enforcing an [`AccessPolicy`] with tokens from a [`JwtManager`]
///
/// ## Security
///
/// - Missing, malformed, expired or forged tokens: `Status::unauthenticated`
/// - Valid token whose role is not allowed: `Status::permission_denied`
/// - Validated claims are stored in request extensions for handlers
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_jwt_propagation::{AccessPolicy, JwtServerLayer};
/// use std::sync::Arc;
/// use tonic::transport::Server;
///
/// # fn example(jwt: Arc<crypto_core::JwtManager>) {
/// let policy = AccessPolicy::new().allow("/pkg.Service/Write", ["admin"]);
/// let builder = Server::builder().layer(JwtServerLayer::new(jwt, Arc::new(policy)));
/// // builder.add_service(...).serve(addr)
/// # }
/// ```
#[derive(Clone)]
pub struct JwtServerLayer {
    jwt: Arc<JwtManager>,
    policy: Arc<AccessPolicy>,
}

impl JwtServerLayer {
    pub fn new(jwt: Arc<JwtManager>, policy: Arc<AccessPolicy>) -> Self {
        Self { jwt, policy }
    }

    /// Decide whether a call to `method` carrying `headers` may proceed
    ///
    /// ## Errors
    ///
    /// - `Status::unauthenticated` if the method is protected and the
    ///   authorization header is missing or the token fails validation
    /// - `Status::permission_denied` if the token role is not allowed
    pub fn authorize(&self, method: &str, headers: &HeaderMap) -> Result<Decision, Status> {
        let Some(allowed_roles) = self.policy.allowed_roles(method) else {
            return Ok(Decision::Public);
        };

        let raw = headers
            .get(AUTHORIZATION_HEADER)
            .ok_or_else(|| Status::unauthenticated("auth token is not provided"))?;

        let raw = raw
            .to_str()
            .map_err(|_| Status::unauthenticated("access token is invalid"))?;

        // Accept both the raw token and the "Bearer <token>" form
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

        let claims = self
            .jwt
            .validate(token)
            .map(|claims| JwtClaims::from_validated_claims(&claims))
            .map_err(|_| Status::unauthenticated("access token is invalid"))?;

        if !claims.has_any_role(allowed_roles) {
            return Err(Status::permission_denied(
                "no permission to access this RPC",
            ));
        }

        Ok(Decision::Authorized(claims))
    }
}

impl<S> Layer<S> for JwtServerLayer {
    type Service = JwtServerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        JwtServerService {
            inner: service,
            auth: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct JwtServerService<S> {
    inner: S,
    auth: JwtServerLayer,
}

impl<S, B> Service<http::Request<B>> for JwtServerService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let method = req.uri().path().to_string();

        match self.auth.authorize(&method, req.headers()) {
            Ok(decision) => {
                match decision {
                    Decision::Public => {
                        info!(method = %method, decision = "public", "rpc authorized");
                    }
                    Decision::Authorized(claims) => {
                        info!(
                            method = %method,
                            decision = "authorized",
                            username = %claims.username,
                            role = %claims.role,
                            "rpc authorized"
                        );
                        req.extensions_mut().insert(claims);
                    }
                }

                // The clone that was driven to readiness handles this call
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(inner.call(req))
            }
            Err(status) => {
                warn!(
                    method = %method,
                    decision = "rejected",
                    code = ?status.code(),
                    "rpc rejected: {}",
                    status.message()
                );
                let response = status_response(&status);
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// Build a trailers-only gRPC response carrying `status`
fn status_response(status: &Status) -> http::Response<BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/grpc"));
    if let Err(err) = status.add_header(headers) {
        warn!(error = %err, "failed to encode rejection status");
    }
    response
}
