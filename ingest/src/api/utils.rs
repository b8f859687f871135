use crate::errors::IngestError;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use shared::http::make_text_response;

pub type HandlerBody = BoxBody<Bytes, IngestError>;

/// Collects a request body, refusing anything larger than `max_bytes`.
pub async fn read_body<B>(body: B, max_bytes: usize) -> Result<Bytes, IngestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, max_bytes).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(IngestError::PayloadTooLarge(max_bytes)),
        Err(e) => Err(IngestError::RequestBodyError(e.to_string())),
    }
}

pub fn imported_response(rows: usize) -> Response<HandlerBody> {
    make_text_response(StatusCode::OK, format!("Successfully imported {rows} rows"))
}
