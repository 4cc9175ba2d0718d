use crate::context::Interrupted;
use crate::store::StoreError;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid username/password")]
    InvalidCredentials,

    #[error("Request is canceled")]
    Canceled,

    #[error("Deadline is exceeded")]
    DeadlineExceeded,

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            CatalogError::InvalidArgument(msg) => Status::new(Code::InvalidArgument, msg.clone()),
            CatalogError::NotFound(msg) => Status::new(Code::NotFound, msg.clone()),
            CatalogError::AlreadyExists(msg) => Status::new(Code::AlreadyExists, msg.clone()),
            CatalogError::InvalidCredentials => {
                Status::new(Code::InvalidArgument, "invalid username/password")
            }
            CatalogError::Canceled => Status::new(Code::Cancelled, "request is canceled"),
            CatalogError::DeadlineExceeded => {
                Status::new(Code::DeadlineExceeded, "deadline is exceeded")
            }
            CatalogError::Unknown(msg) => Status::new(Code::Unknown, msg.clone()),
            CatalogError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Status::new(Code::Internal, "internal server error")
            }
        }
    }
}

impl From<Interrupted> for CatalogError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Canceled => CatalogError::Canceled,
            Interrupted::DeadlineExceeded => CatalogError::DeadlineExceeded,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordExists(_) | StoreError::UserExists(_) => {
                CatalogError::AlreadyExists(format!("cannot save to the store: {}", err))
            }
            StoreError::Interrupted(interrupted) => interrupted.into(),
            StoreError::Sink(msg) => CatalogError::Unknown(msg),
            StoreError::Io(_) => CatalogError::Internal(err.to_string()),
        }
    }
}

// gRPC Status conversion
impl From<CatalogError> for Status {
    fn from(err: CatalogError) -> Self {
        err.to_status()
    }
}
