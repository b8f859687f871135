use crate::api::utils::{HandlerBody, imported_response, read_body};
use crate::errors::{IngestError, Result};
use crate::ingestor::Ingestor;
use crate::normalizer::{JsonRow, RawInput};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use serde::Deserialize;

#[derive(Deserialize)]
struct ImportRequest {
    rows: Vec<JsonRow>,
}

/// `{"rows": [...]}` where every row carries all canonical fields.
pub async fn handle<B>(
    ingestor: &Ingestor,
    request: Request<B>,
    max_body_bytes: usize,
) -> Result<Response<HandlerBody>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(request.into_body(), max_body_bytes).await?;
    let payload: ImportRequest = serde_json::from_slice(&bytes)
        .map_err(|e| IngestError::RequestBodyError(e.to_string()))?;

    let rows = ingestor.import(RawInput::Json(payload.rows)).await?;
    Ok(imported_response(rows))
}
