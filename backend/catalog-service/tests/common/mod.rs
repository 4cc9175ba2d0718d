//! Shared helpers: a real catalog server on an ephemeral port

#![allow(dead_code)]

use catalog_service::client::{connect_with_channel, CatalogSession};
use catalog_service::config::{ClientSettings, Settings};
use catalog_service::grpc::{record::Weight, Cpu, Memory, MemoryUnit, Record};
use catalog_service::{build_router, AppState};
use std::path::Path;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;

pub struct TestServer {
    pub url: String,
    pub state: AppState,
    images: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let images = tempfile::tempdir().unwrap();
        let folder = images.path().display().to_string();

        let settings = Settings::from_vars(|key| match key {
            "JWT_SECRET" => Some("integration-secret".to_string()),
            "IMAGE_FOLDER" => Some(folder.clone()),
            _ => None,
        })
        .unwrap();
        let state = AppState::from_settings(&settings).await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let router = build_router(&state);
        let handle = tokio::spawn(async move {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
            images,
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn image_folder(&self) -> &Path {
        self.images.path()
    }

    pub async fn channel(&self) -> Channel {
        Channel::from_shared(self.url.clone())
            .unwrap()
            .connect()
            .await
            .unwrap()
    }

    pub async fn session(&self, username: &str, password: &str) -> CatalogSession {
        let settings = ClientSettings::new(self.url.clone(), username, password);
        connect_with_channel(self.channel().await, &settings)
            .await
            .unwrap()
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.handle.await;
    }
}

/// Record with an empty id (the server mints one)
pub fn record(price_usd: f64, cores: u32, min_ghz: f64, ram_gb: u64) -> Record {
    Record {
        brand: "Acme".to_string(),
        name: "Book Pro".to_string(),
        cpu: Some(Cpu {
            brand: "Acme".to_string(),
            name: "A2".to_string(),
            number_cores: cores,
            number_threads: cores * 2,
            min_ghz,
            max_ghz: min_ghz + 1.5,
        }),
        memory: Some(Memory::new(ram_gb, MemoryUnit::Gigabyte)),
        weight: Some(Weight::WeightKg(1.3)),
        price_usd,
        release_year: 2023,
        ..Default::default()
    }
}
