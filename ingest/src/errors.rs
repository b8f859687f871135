use crate::api::utils::HandlerBody;
use crate::config::ConfigValidationError;
use crate::ingestor::ImportError;
use crate::push_queue::QueueError;
use crate::store::StoreError;
use crate::tabular::TabularError;
use hyper::{Response, StatusCode};
use shared::http::{make_error_response, make_text_response};
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Errors that can occur while serving ingestion requests
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("No route matched for request")]
    NoRouteMatched,

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Unreadable spreadsheet: {0}")]
    Tabular(#[from] TabularError),

    #[error("Failed to queue push: {0}")]
    Queue(#[from] QueueError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::RequestBodyError(_)
            | IngestError::InvalidUpload(_)
            | IngestError::MissingParameter(_)
            | IngestError::Tabular(_)
            | IngestError::Import(ImportError::Validation(_)) => StatusCode::BAD_REQUEST,
            IngestError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::NoRouteMatched => StatusCode::NOT_FOUND,
            IngestError::Queue(QueueError::Full) => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::Import(_)
            | IngestError::Queue(_)
            | IngestError::Config(_)
            | IngestError::Store(_)
            | IngestError::InternalError(_)
            | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text response carrying the error message.
    ///
    /// Failures that are not about the request itself only expose the status
    /// reason; their detail goes to the log.
    pub fn into_response(self) -> Response<HandlerBody> {
        let status = self.status_code();
        match self {
            IngestError::Queue(_)
            | IngestError::Config(_)
            | IngestError::Store(_)
            | IngestError::InternalError(_)
            | IngestError::Io(_) => {
                tracing::error!(error = %self, "Request failed");
                make_error_response(status)
            }
            other => make_text_response(status, other.to_string()),
        }
    }
}
