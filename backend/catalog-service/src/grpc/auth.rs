/// gRPC AuthService: exchanges credentials for an access token
use super::{AuthService, LoginRequest, LoginResponse};
use crate::error::CatalogError;
use crate::security::JwtManager;
use crate::store::UserStore;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AuthServiceImpl {
    users: Arc<dyn UserStore>,
    jwt: Arc<JwtManager>,
}

impl AuthServiceImpl {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<JwtManager>) -> Self {
        Self { users, jwt }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> std::result::Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let user = self
            .users
            .find(&req.username)
            .ok_or(CatalogError::InvalidCredentials)?;

        // Argon2 verification is CPU bound
        let password = req.password;
        let checked = user.clone();
        let password_valid = tokio::task::spawn_blocking(move || checked.is_correct_password(&password))
            .await
            .map_err(|e| CatalogError::Internal(format!("password check panicked: {}", e)))??;

        if !password_valid {
            warn!(username = %req.username, "login rejected");
            return Err(CatalogError::InvalidCredentials.into());
        }

        let access_token = self
            .jwt
            .generate(&user.username, &user.role)
            .map_err(|e| CatalogError::Internal(format!("cannot generate access token: {}", e)))?;

        info!(username = %user.username, role = %user.role, "user logged in");

        Ok(Response::new(LoginResponse { access_token }))
    }
}
