/// gRPC RecordService implementation
///
/// Implements all RPCs of catalog.v1.RecordService:
/// - CreateRecord: unary
/// - SearchRecords: server streaming, search runs on the blocking pool
/// - RateRecords: bidirectional streaming
/// - UploadImage: client streaming
///
/// Role checks happen in the JWT layer before any of these run.
use super::rating::process_ratings;
use super::upload::receive_image;
use super::{
    CreateRecordRequest, CreateRecordResponse, RateRecordRequest, RateRecordResponse, RecordService,
    SearchRecordsRequest, SearchRecordsResponse, UploadImageRequest, UploadImageResponse,
};
use crate::context::CallContext;
use crate::error::CatalogError;
use crate::store::{AssetStore, RatingStore, RecordStore, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Matches buffered between the search thread and the response stream
const SEARCH_BUFFER: usize = 16;
const RATING_BUFFER: usize = 16;

#[derive(Clone)]
pub struct RecordServiceImpl {
    records: Arc<dyn RecordStore>,
    ratings: Arc<dyn RatingStore>,
    assets: Arc<dyn AssetStore>,
}

impl RecordServiceImpl {
    pub fn new(
        records: Arc<dyn RecordStore>,
        ratings: Arc<dyn RatingStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            records,
            ratings,
            assets,
        }
    }
}

/// Cancel `ctx` once the consumer of `tx` goes away
///
/// The watcher exits when the returned sender is dropped, so the producer
/// must hold it for as long as it produces.
fn cancel_when_closed<T: Send + 'static>(
    ctx: &CallContext,
    tx: &mpsc::Sender<T>,
) -> oneshot::Sender<()> {
    let ctx = ctx.clone();
    let tx = tx.clone();
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::select! {
            _ = tx.closed() => {
                debug!("response stream closed by client");
                ctx.cancel();
            }
            _ = done_rx => {}
        }
    });
    done_tx
}

#[tonic::async_trait]
impl RecordService for RecordServiceImpl {
    type SearchRecordsStream = ReceiverStream<Result<SearchRecordsResponse, Status>>;
    type RateRecordsStream = ReceiverStream<Result<RateRecordResponse, Status>>;

    async fn create_record(
        &self,
        request: Request<CreateRecordRequest>,
    ) -> Result<Response<CreateRecordResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let mut record = request
            .into_inner()
            .record
            .ok_or_else(|| CatalogError::InvalidArgument("record is required".to_string()))?;

        info!(record_id = %record.id, "received create-record request");

        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        } else {
            Uuid::parse_str(&record.id).map_err(|e| {
                CatalogError::InvalidArgument(format!("record id is not a valid UUID: {}", e))
            })?;
        }

        ctx.check().map_err(CatalogError::from)?;

        self.records.save(&record).map_err(|err| match err {
            StoreError::RecordExists(_) => CatalogError::from(err),
            other => CatalogError::Internal(format!("cannot save record to the store: {}", other)),
        })?;

        info!(record_id = %record.id, "saved record");

        Ok(Response::new(CreateRecordResponse { id: record.id }))
    }

    async fn search_records(
        &self,
        request: Request<SearchRecordsRequest>,
    ) -> Result<Response<Self::SearchRecordsStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let filter = request.into_inner().filter.unwrap_or_default();

        info!(?filter, "received search-records request");

        let (tx, rx) = mpsc::channel(SEARCH_BUFFER);
        let watcher = cancel_when_closed(&ctx, &tx);

        let records = self.records.clone();
        tokio::task::spawn_blocking(move || {
            let _watcher = watcher;
            let mut sent = 0usize;
            let result = records.search(&ctx, &filter, &mut |record| {
                let record_id = record.id.clone();
                tx.blocking_send(Ok(SearchRecordsResponse {
                    record: Some(record),
                }))
                .map_err(|_| StoreError::Sink("cannot send stream response".to_string()))?;
                info!(record_id = %record_id, "sent matching record");
                sent += 1;
                Ok(())
            });

            match result {
                Ok(()) => info!(sent, "search completed"),
                Err(err) => {
                    let status = Status::from(CatalogError::from(err));
                    warn!(sent, code = ?status.code(), "search aborted: {}", status.message());
                    // Receiver may already be gone
                    let _ = tx.blocking_send(Err(status));
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn rate_records(
        &self,
        request: Request<Streaming<RateRecordRequest>>,
    ) -> Result<Response<Self::RateRecordsStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let stream = request.into_inner();

        let (tx, rx) = mpsc::channel(RATING_BUFFER);
        let watcher = cancel_when_closed(&ctx, &tx);

        let records = self.records.clone();
        let ratings = self.ratings.clone();
        tokio::spawn(async move {
            let _watcher = watcher;
            let result =
                process_ratings(&ctx, records.as_ref(), ratings.as_ref(), stream, &tx).await;
            if let Err(err) = result {
                let status = err.to_status();
                warn!(code = ?status.code(), "rating stream aborted: {}", status.message());
                let _ = tx.send(Err(status)).await;
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let stream = request.into_inner();

        let response = receive_image(&ctx, self.records.as_ref(), self.assets.as_ref(), stream)
            .await
            .map_err(|err| {
                warn!("upload failed: {}", err);
                Status::from(err)
            })?;

        Ok(Response::new(response))
    }
}
