use crate::api::utils::{HandlerBody, imported_response, read_body};
use crate::config::ImportConfig;
use crate::errors::{IngestError, Result};
use crate::ingestor::Ingestor;
use crate::normalizer::RawInput;
use crate::tabular::TabularReader;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response};
use multer::Multipart;
use std::io::Cursor;
use std::sync::Arc;

/// Multipart upload of a workbook; only its first sheet is imported and row 1
/// is the header row.
pub async fn handle<B>(
    ingestor: &Ingestor,
    reader: Arc<dyn TabularReader>,
    request: Request<B>,
    config: &ImportConfig,
) -> Result<Response<HandlerBody>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| IngestError::InvalidUpload("missing content type".into()))?;
    let boundary = multer::parse_boundary(content_type).map_err(invalid_upload)?;

    let body = read_body(request.into_body(), config.max_body_bytes).await?;
    let upload = extract_upload(body, boundary, &config.upload_field).await?;

    let sheet = tokio::task::spawn_blocking(move || reader.read_first_sheet(&upload))
        .await
        .map_err(|e| IngestError::InternalError(format!("spreadsheet reader panicked: {e}")))??;

    let rows = ingestor.import(RawInput::Tabular(sheet)).await?;
    Ok(imported_response(rows))
}

// Prefers the configured field; otherwise takes the first part carrying a filename.
async fn extract_upload(
    body: Bytes,
    boundary: String,
    field_name: &str,
) -> Result<Bytes, IngestError> {
    let mut multipart = Multipart::with_reader(Cursor::new(body), boundary);
    let mut fallback = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        let named = field.name() == Some(field_name);
        let is_file = field.file_name().is_some();
        if !named && (!is_file || fallback.is_some()) {
            continue;
        }

        let data = field.bytes().await.map_err(invalid_upload)?;
        if named {
            return Ok(data);
        }
        fallback = Some(data);
    }

    fallback.ok_or_else(|| IngestError::InvalidUpload(format!("no file in field {field_name:?}")))
}

fn invalid_upload(e: multer::Error) -> IngestError {
    IngestError::InvalidUpload(e.to_string())
}
