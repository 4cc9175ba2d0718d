//! Client-side session for the catalog service
//!
//! [`AuthClient`] logs in over the AuthService; [`connect_record_client`]
//! wires it into a [`TokenRefresher`] and returns a [`CatalogSession`]
//! whose protected calls carry a fresh token. The session also wraps each
//! RecordService call: creating, searching, rating, and uploading an image
//! file in chunks.

use crate::config::ClientSettings;
use crate::grpc::{
    AuthServiceClient, CreateRecordRequest, Filter, LoginRequest, RateRecordRequest,
    RateRecordResponse, Record, RecordServiceClient, SearchRecordsRequest, UploadImageRequest,
    UploadImageResponse,
};
use crate::policy::catalog_policy;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use grpc_jwt_propagation::{JwtClientInterceptor, RefreshConfig, TokenRefresher, TokenSource};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codegen::InterceptedService;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tracing::{debug, info, warn};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of each chunk sent by [`CatalogSession::upload_image_file`]
pub const UPLOAD_CHUNK_SIZE: usize = 1024;

pub type CatalogClient = RecordServiceClient<InterceptedService<Channel, JwtClientInterceptor>>;

/// Logs in with fixed credentials
#[derive(Clone)]
pub struct AuthClient {
    service: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl AuthClient {
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            service: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl TokenSource for AuthClient {
    async fn login(&self) -> std::result::Result<String, Status> {
        let mut request = Request::new(LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        });
        request.set_timeout(LOGIN_TIMEOUT);

        let response = self.service.clone().login(request).await?;
        debug!(username = %self.username, "logged in");
        Ok(response.into_inner().access_token)
    }
}

/// A RecordService client plus the refresher keeping its token fresh
///
/// Call [`CatalogSession::shutdown`] to stop the refresh loop.
pub struct CatalogSession {
    pub client: CatalogClient,
    refresher: TokenRefresher,
}

impl CatalogSession {
    pub fn current_token(&self) -> String {
        self.refresher.current_token()
    }

    pub async fn shutdown(self) {
        self.refresher.shutdown().await;
    }

    /// Create `record` and return its id
    ///
    /// An empty id lets the server mint one.
    pub async fn create_record(&mut self, record: Record) -> Result<String> {
        let mut request = Request::new(CreateRecordRequest {
            record: Some(record),
        });
        request.set_timeout(CALL_TIMEOUT);

        match self.client.create_record(request).await {
            Ok(response) => {
                let id = response.into_inner().id;
                info!(record_id = %id, "created record");
                Ok(id)
            }
            Err(status) if status.code() == Code::AlreadyExists => {
                warn!("record already exists: {}", status.message());
                Err(status).context("cannot create record")
            }
            Err(status) => Err(status).context("cannot create record"),
        }
    }

    /// Every record matching `filter`, in the order the server sent them
    pub async fn search_records(&mut self, filter: Filter) -> Result<Vec<Record>> {
        info!(?filter, "searching records");
        let mut request = Request::new(SearchRecordsRequest {
            filter: Some(filter),
        });
        request.set_timeout(CALL_TIMEOUT);

        let mut stream = self
            .client
            .search_records(request)
            .await
            .context("cannot search records")?
            .into_inner();

        let mut found = Vec::new();
        while let Some(response) = stream
            .message()
            .await
            .context("cannot receive search response")?
        {
            let Some(record) = response.record else {
                continue;
            };
            debug!(record_id = %record.id, price_usd = record.price_usd, "found record");
            found.push(record);
        }

        info!(count = found.len(), "search finished");
        Ok(found)
    }

    /// Upload the image at `path` for `record_id`
    ///
    /// The image type is taken from the file extension. The file goes out as
    /// one info message followed by [`UPLOAD_CHUNK_SIZE`] chunks.
    pub async fn upload_image_file(
        &mut self,
        record_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<UploadImageResponse> {
        let path = path.as_ref();
        let image_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .with_context(|| format!("{} has no file extension", path.display()))?;
        let image = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read image file {}", path.display()))?;

        let mut messages = Vec::with_capacity(1 + image.len() / UPLOAD_CHUNK_SIZE + 1);
        messages.push(UploadImageRequest::info(record_id, image_type));
        messages.extend(image.chunks(UPLOAD_CHUNK_SIZE).map(UploadImageRequest::chunk));
        debug!(chunks = messages.len() - 1, bytes = image.len(), "sending image");

        let mut request = Request::new(tokio_stream::iter(messages));
        request.set_timeout(CALL_TIMEOUT);

        let response = self
            .client
            .upload_image(request)
            .await
            .context("cannot upload image")?
            .into_inner();

        info!(image_id = %response.id, size = response.size, "image uploaded");
        Ok(response)
    }

    /// Rate each record in `record_ids` with the matching entry of `scores`
    ///
    /// Submissions are sent while responses are read. Fails unless every
    /// submission was answered.
    pub async fn rate_records(
        &mut self,
        record_ids: &[String],
        scores: &[f64],
    ) -> Result<Vec<RateRecordResponse>> {
        if record_ids.len() != scores.len() {
            bail!(
                "got {} record ids but {} scores",
                record_ids.len(),
                scores.len()
            );
        }

        let requests: Vec<RateRecordRequest> = record_ids
            .iter()
            .zip(scores)
            .map(|(record_id, &score)| RateRecordRequest {
                record_id: record_id.clone(),
                score,
            })
            .collect();
        let expected = requests.len();

        let (tx, rx) = mpsc::channel(expected.max(1));
        let sender = tokio::spawn(async move {
            for request in requests {
                debug!(record_id = %request.record_id, score = request.score, "sending rating");
                if tx.send(request).await.is_err() {
                    break;
                }
            }
        });

        let mut stream = self
            .client
            .rate_records(ReceiverStream::new(rx))
            .await
            .context("cannot rate records")?
            .into_inner();

        let mut responses = Vec::with_capacity(expected);
        while let Some(response) = stream
            .message()
            .await
            .context("cannot receive rating response")?
        {
            info!(
                record_id = %response.record_id,
                rated_count = response.rated_count,
                average_score = response.average_score,
                "received rating"
            );
            responses.push(response);
        }

        sender.await.context("rating sender task failed")?;

        if responses.len() != expected {
            bail!(
                "sent {} ratings but received {} responses",
                expected,
                responses.len()
            );
        }
        Ok(responses)
    }
}

/// Dial the server, log in, and build a token-carrying RecordService client
pub async fn connect_record_client(settings: &ClientSettings) -> Result<CatalogSession> {
    let channel = Endpoint::from_shared(settings.server_url.clone())
        .context("Invalid server URL")?
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", settings.server_url))?;

    connect_with_channel(channel, settings).await
}

/// Same as [`connect_record_client`] over an existing channel
pub async fn connect_with_channel(channel: Channel, settings: &ClientSettings) -> Result<CatalogSession> {
    let auth = AuthClient::new(
        channel.clone(),
        settings.username.clone(),
        settings.password.clone(),
    );

    let config = RefreshConfig {
        refresh_interval: settings.refresh_interval,
        retry_backoff: settings.retry_backoff,
    };
    let refresher = TokenRefresher::start(Arc::new(auth), config)
        .await
        .map_err(|status| anyhow::anyhow!("initial login failed: {}", status.message()))?;

    let policy = catalog_policy();
    let interceptor = refresher.interceptor(policy.protected_methods());

    info!(server = %settings.server_url, username = %settings.username, "catalog session ready");

    Ok(CatalogSession {
        client: RecordServiceClient::with_interceptor(channel, interceptor),
        refresher,
    })
}
