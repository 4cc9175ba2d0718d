//! Client-streaming image upload
//!
//! The first message names the owner record and the image type; every
//! following message carries a chunk. Chunks are buffered in memory up to
//! [`MAX_IMAGE_SIZE`] and handed to the [`AssetStore`] once the client
//! closes its side. Nothing is persisted when the call fails.

use super::upload_image_request::Data;
use super::{UploadImageRequest, UploadImageResponse};
use crate::context::CallContext;
use crate::error::{CatalogError, Result};
use crate::store::{AssetStore, RecordStore};
use futures::{Stream, StreamExt};
use tonic::{Code, Status};
use tracing::{debug, info, warn};

/// Upper bound on the total size of one image
pub const MAX_IMAGE_SIZE: usize = 1 << 20;

/// Longest accepted image type, e.g. `.jpeg`
const MAX_IMAGE_TYPE_LEN: usize = 16;

pub async fn receive_image<S>(
    ctx: &CallContext,
    records: &dyn RecordStore,
    assets: &dyn AssetStore,
    mut stream: S,
) -> Result<UploadImageResponse>
where
    S: Stream<Item = std::result::Result<UploadImageRequest, Status>> + Unpin,
{
    let first = ctx
        .run(stream.next())
        .await?
        .ok_or_else(|| CatalogError::InvalidArgument("missing image info".to_string()))?
        .map_err(|status| receive_error("cannot receive image info", status))?;

    let info = match first.data {
        Some(Data::Info(info)) => info,
        _ => {
            return Err(CatalogError::InvalidArgument(
                "first message must carry image info".to_string(),
            ))
        }
    };

    info!(
        record_id = %info.record_id,
        image_type = %info.image_type,
        "received upload-image request"
    );

    if records.find(&info.record_id).is_none() {
        return Err(CatalogError::NotFound(format!(
            "record {} does not exist",
            info.record_id
        )));
    }

    if !is_valid_image_type(&info.image_type) {
        return Err(CatalogError::InvalidArgument(format!(
            "invalid image type: {:?}",
            info.image_type
        )));
    }

    let mut image = Vec::new();

    loop {
        debug!(received = image.len(), "waiting to receive more data");

        let Some(message) = ctx.run(stream.next()).await? else {
            debug!("no more data");
            break;
        };
        let message = message.map_err(|status| receive_error("cannot receive chunk data", status))?;

        let chunk = match message.data {
            Some(Data::ChunkData(chunk)) => chunk,
            Some(Data::Info(_)) => {
                return Err(CatalogError::InvalidArgument(
                    "image info sent more than once".to_string(),
                ))
            }
            None => {
                return Err(CatalogError::InvalidArgument(
                    "upload message carries no data".to_string(),
                ))
            }
        };

        let size = image.len() + chunk.len();
        if size > MAX_IMAGE_SIZE {
            warn!(size, limit = MAX_IMAGE_SIZE, "image is too large");
            return Err(CatalogError::InvalidArgument(format!(
                "image is too large: {} > {}",
                size, MAX_IMAGE_SIZE
            )));
        }

        image.extend_from_slice(&chunk);
    }

    ctx.check()?;

    let size = image.len();
    let id = assets
        .save(&info.record_id, &info.image_type, image)
        .await
        .map_err(|e| CatalogError::Internal(format!("cannot save image to the store: {}", e)))?;

    info!(image_id = %id, size, "saved image");

    Ok(UploadImageResponse {
        id,
        size: size as u32,
    })
}

/// A dot followed by a few alphanumeric characters
fn is_valid_image_type(image_type: &str) -> bool {
    match image_type.strip_prefix('.') {
        Some(ext) => {
            !ext.is_empty()
                && image_type.len() <= MAX_IMAGE_TYPE_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn receive_error(context: &str, status: Status) -> CatalogError {
    if status.code() == Code::Cancelled {
        return CatalogError::Canceled;
    }
    CatalogError::Unknown(format!("{}: {}", context, status.message()))
}
