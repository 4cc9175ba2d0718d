//! Client-side JWT Interceptor
//!
//! Injects the current access token into outgoing gRPC requests for the
//! methods that need one, and keeps that token fresh in the background.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{GrpcMethod, Request, Status};
use tracing::{debug, info, warn};

/// Something that can log in and hand back a fresh access token
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn login(&self) -> Result<String, Status>;
}

/// Timing of the background refresh loop
#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// Delay between successful refreshes
    pub refresh_interval: Duration,
    /// Delay before retrying after a failed refresh
    pub retry_backoff: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

type SharedToken = Arc<RwLock<AsciiMetadataValue>>;

/// Client-side interceptor that attaches the current token to protected calls
///
/// ## Design
///
/// - **Per-method**: only methods listed at construction get the header;
///   the method is read from tonic's `GrpcMethod` request extension
/// - **Shared token**: every clone reads the token the refresher last stored
/// - **Streams**: the interceptor runs once when a stream is opened
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_jwt_propagation::{RefreshConfig, TokenRefresher, TokenSource};
/// use std::sync::Arc;
///
/// # async fn example(source: Arc<dyn TokenSource>) -> Result<(), tonic::Status> {
/// let refresher = TokenRefresher::start(source, RefreshConfig::default()).await?;
/// let interceptor = refresher.interceptor(["/pkg.Service/Write"]);
/// // let client = SomeServiceClient::with_interceptor(channel, interceptor);
/// refresher.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JwtClientInterceptor {
    token: SharedToken,
    methods: Arc<HashSet<String>>,
}

impl JwtClientInterceptor {
    fn requires_token(&self, method: &GrpcMethod) -> bool {
        let path = format!("/{}/{}", method.service(), method.method());
        self.methods.contains(&path)
    }
}

impl Interceptor for JwtClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let needs_token = request
            .extensions()
            .get::<GrpcMethod>()
            .map(|method| self.requires_token(method))
            .unwrap_or(false);

        if needs_token {
            let token = self.token.read().clone();
            request.metadata_mut().insert("authorization", token);
        }

        Ok(request)
    }
}

/// Background task that keeps an access token fresh
///
/// The first login happens inside [`TokenRefresher::start`]; afterwards a
/// tokio task logs in again every `refresh_interval`, falling back to
/// `retry_backoff` after a failure. The task stops on [`TokenRefresher::shutdown`]
/// or when the refresher is dropped.
pub struct TokenRefresher {
    token: SharedToken,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TokenRefresher {
    /// Log in once and start the refresh loop
    ///
    /// ## Errors
    ///
    /// Returns the login error if the first login fails; no task is spawned.
    pub async fn start(source: Arc<dyn TokenSource>, config: RefreshConfig) -> Result<Self, Status> {
        let initial = fetch_token(source.as_ref()).await?;
        let token = Arc::new(RwLock::new(initial));
        let (stop, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(refresh_loop(source, token.clone(), config, stop_rx));

        info!(
            refresh_interval_ms = config.refresh_interval.as_millis() as u64,
            "token refresher started"
        );

        Ok(Self {
            token,
            stop,
            handle,
        })
    }

    /// Interceptor attaching the managed token to each method in `methods`
    ///
    /// Methods are full paths, e.g. `/catalog.v1.RecordService/CreateRecord`.
    pub fn interceptor<I, M>(&self, methods: I) -> JwtClientInterceptor
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        JwtClientInterceptor {
            token: self.token.clone(),
            methods: Arc::new(methods.into_iter().map(Into::into).collect()),
        }
    }

    /// Token currently attached to outgoing calls
    pub fn current_token(&self) -> String {
        self.token.read().to_str().unwrap_or_default().to_string()
    }

    /// Stop the refresh loop and wait for it to finish
    pub async fn shutdown(self) {
        // Receiver gone means the loop already exited
        let _ = self.stop.send(true);
        if let Err(err) = self.handle.await {
            warn!(error = %err, "token refresher task failed");
        }
        info!("token refresher stopped");
    }
}

async fn fetch_token(source: &dyn TokenSource) -> Result<AsciiMetadataValue, Status> {
    let token = source.login().await?;
    AsciiMetadataValue::try_from(token)
        .map_err(|_| Status::internal("access token contains invalid characters"))
}

async fn refresh_loop(
    source: Arc<dyn TokenSource>,
    token: SharedToken,
    config: RefreshConfig,
    mut stop: watch::Receiver<bool>,
) {
    let mut wait = config.refresh_interval;

    loop {
        tokio::select! {
            // Fires on shutdown() and also when the sender is dropped
            _ = stop.changed() => {
                debug!("token refresh loop received stop signal");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match fetch_token(source.as_ref()).await {
            Ok(fresh) => {
                *token.write() = fresh;
                info!("access token refreshed");
                wait = config.refresh_interval;
            }
            Err(status) => {
                warn!(
                    code = ?status.code(),
                    retry_in_ms = config.retry_backoff.as_millis() as u64,
                    "token refresh failed: {}",
                    status.message()
                );
                wait = config.retry_backoff;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PROTECTED: &str = "/pkg.Svc/Write";

    /// Issues "token-N" on the N-th login; logins listed in `fail_on` fail
    struct CountingSource {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl CountingSource {
        fn new(fail_on: Vec<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_on,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn login(&self) -> Result<String, Status> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&n) {
                Err(Status::unavailable("auth server down"))
            } else {
                Ok(format!("token-{}", n))
            }
        }
    }

    fn config() -> RefreshConfig {
        RefreshConfig {
            refresh_interval: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
        }
    }

    fn request_for(service: &'static str, method: &'static str) -> Request<()> {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(GrpcMethod::new(service, method));
        request
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_when_first_login_fails() {
        let source = CountingSource::new(vec![1]);
        let result = TokenRefresher::start(source.clone(), config()).await;

        assert_eq!(result.err().map(|s| s.code()), Some(tonic::Code::Unavailable));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interceptor_attaches_token_to_protected_method() {
        let source = CountingSource::new(vec![]);
        let refresher = TokenRefresher::start(source, config()).await.unwrap();
        let mut interceptor = refresher.interceptor([PROTECTED]);

        let request = interceptor.call(request_for("pkg.Svc", "Write")).unwrap();
        let auth = request.metadata().get("authorization").unwrap();
        assert_eq!(auth.to_str().unwrap(), "token-1");

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interceptor_skips_public_method() {
        let source = CountingSource::new(vec![]);
        let refresher = TokenRefresher::start(source, config()).await.unwrap();
        let mut interceptor = refresher.interceptor([PROTECTED]);

        let request = interceptor.call(request_for("pkg.Svc", "Read")).unwrap();
        assert!(request.metadata().get("authorization").is_none());

        // No method info at all: pass through untouched
        let request = interceptor.call(Request::new(())).unwrap();
        assert!(request.metadata().get("authorization").is_none());

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_token() {
        let source = CountingSource::new(vec![]);
        let refresher = TokenRefresher::start(source.clone(), config()).await.unwrap();
        let mut interceptor = refresher.interceptor([PROTECTED]);

        tokio::time::sleep(Duration::from_millis(30_500)).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(refresher.current_token(), "token-2");
        let request = interceptor.call(request_for("pkg.Svc", "Write")).unwrap();
        assert_eq!(
            request.metadata().get("authorization").unwrap().to_str().unwrap(),
            "token-2"
        );

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_retries_after_backoff() {
        // Login #2 (first refresh) fails
        let source = CountingSource::new(vec![2]);
        let refresher = TokenRefresher::start(source.clone(), config()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(refresher.current_token(), "token-1");

        // Retry after 1s backoff succeeds
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(refresher.current_token(), "token-3");

        // Back on the normal interval
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(source.calls(), 3);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 4);

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refreshing() {
        let source = CountingSource::new(vec![]);
        let refresher = TokenRefresher::start(source.clone(), config()).await.unwrap();

        refresher.shutdown().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_refresher_stops_loop() {
        let source = CountingSource::new(vec![]);
        let refresher = TokenRefresher::start(source.clone(), config()).await.unwrap();

        drop(refresher);
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(source.calls(), 1);
    }
}
