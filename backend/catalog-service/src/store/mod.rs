//! In-memory stores shared by every call
//!
//! - `users`: registered principals
//! - `records`: catalog records with copy-in/copy-out isolation
//! - `filter`: search predicate and memory normalization
//! - `ratings`: running rating aggregates per record
//! - `images`: uploaded image assets on disk

pub mod filter;
pub mod images;
pub mod ratings;
pub mod records;
pub mod users;

pub use images::{AssetStore, DiskImageStore, ImageInfo};
pub use ratings::{InMemoryRatingStore, Rating, RatingStore};
pub use records::{InMemoryRecordStore, RecordStore};
pub use users::{InMemoryUserStore, User, UserStore};

use crate::context::Interrupted;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record with id {0} already exists")]
    RecordExists(String),

    #[error("user {0} already exists")]
    UserExists(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The consumer of a search refused a match
    #[error("{0}")]
    Sink(String),

    #[error("asset I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
