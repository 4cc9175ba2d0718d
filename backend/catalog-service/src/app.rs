//! Server assembly: shared state plus the layered tonic router

use crate::config::Settings;
use crate::error::Result;
use crate::grpc::{AuthServiceImpl, AuthServiceServer, RecordServiceImpl, RecordServiceServer};
use crate::policy::{catalog_policy, ROLE_ADMIN, ROLE_USER};
use crate::security::JwtManager;
use crate::store::{
    AssetStore, DiskImageStore, InMemoryRatingStore, InMemoryRecordStore, InMemoryUserStore,
    RatingStore, RecordStore, User, UserStore,
};
use crate::CatalogError;
use grpc_jwt_propagation::{AccessPolicy, JwtServerLayer};
use std::sync::Arc;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tower::layer::util::{Identity, Stack};
use tracing::info;

/// Everything the services share for the lifetime of the process
#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtManager>,
    pub policy: Arc<AccessPolicy>,
    pub users: Arc<dyn UserStore>,
    pub records: Arc<dyn RecordStore>,
    pub ratings: Arc<dyn RatingStore>,
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    /// In-memory stores, disk-backed images, seeded principals
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let jwt = JwtManager::new(&settings.jwt.secret, settings.jwt.token_duration())
            .map_err(|e| CatalogError::Internal(format!("cannot create JWT manager: {}", e)))?;

        let images = DiskImageStore::new(&settings.images.folder);
        images.ensure_folder().await?;

        let users = InMemoryUserStore::new();
        seed_users(&users, settings)?;

        Ok(Self {
            jwt: Arc::new(jwt),
            policy: Arc::new(catalog_policy()),
            users: Arc::new(users),
            records: Arc::new(InMemoryRecordStore::new()),
            ratings: Arc::new(InMemoryRatingStore::new()),
            assets: Arc::new(images),
        })
    }
}

/// Register the default `admin` and `user1` principals
pub fn seed_users(users: &dyn UserStore, settings: &Settings) -> Result<()> {
    let seeds = [
        ("admin", settings.seed.admin_password.as_str(), ROLE_ADMIN),
        ("user1", settings.seed.user_password.as_str(), ROLE_USER),
    ];

    for (username, password, role) in seeds {
        users.save(&User::new(username, password, role)?)?;
        info!(username, role, "seeded user");
    }

    Ok(())
}

pub type CatalogRouter = Router<Stack<JwtServerLayer, Identity>>;

/// Both services behind the JWT layer
pub fn build_router(state: &AppState) -> CatalogRouter {
    let auth = AuthServiceImpl::new(state.users.clone(), state.jwt.clone());
    let records = RecordServiceImpl::new(
        state.records.clone(),
        state.ratings.clone(),
        state.assets.clone(),
    );

    Server::builder()
        .layer(JwtServerLayer::new(state.jwt.clone(), state.policy.clone()))
        .add_service(AuthServiceServer::new(auth))
        .add_service(RecordServiceServer::new(records))
}
