//! Bidirectional rating stream
//!
//! Every incoming `(record_id, score)` is applied to the rating store and
//! answered with the record's updated count and average, in receipt order.

use super::{RateRecordRequest, RateRecordResponse};
use crate::context::CallContext;
use crate::error::{CatalogError, Result};
use crate::store::{RatingStore, RecordStore};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tonic::{Code, Status};
use tracing::{debug, info};

pub type RatingSender = mpsc::Sender<std::result::Result<RateRecordResponse, Status>>;

/// Apply ratings until the client closes its side
///
/// Returns the first failure; the caller reports it on the response stream.
pub async fn process_ratings<S>(
    ctx: &CallContext,
    records: &dyn RecordStore,
    ratings: &dyn RatingStore,
    mut stream: S,
    responses: &RatingSender,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<RateRecordRequest, Status>> + Unpin,
{
    loop {
        let Some(request) = ctx.run(stream.next()).await? else {
            debug!("no more ratings");
            return Ok(());
        };
        let request = request.map_err(|status| {
            if status.code() == Code::Cancelled {
                CatalogError::Canceled
            } else {
                CatalogError::Unknown(format!(
                    "cannot receive stream request: {}",
                    status.message()
                ))
            }
        })?;

        info!(
            record_id = %request.record_id,
            score = request.score,
            "received rate-record request"
        );

        if records.find(&request.record_id).is_none() {
            return Err(CatalogError::NotFound(format!(
                "record {} does not exist",
                request.record_id
            )));
        }

        // A call canceled mid-stream must not touch the aggregate
        ctx.check()?;

        let rating = ratings.add(&request.record_id, request.score);
        let response = RateRecordResponse {
            record_id: request.record_id,
            rated_count: rating.count,
            average_score: rating.average(),
        };

        responses
            .send(Ok(response))
            .await
            .map_err(|_| CatalogError::Unknown("cannot send stream response".to_string()))?;
    }
}
