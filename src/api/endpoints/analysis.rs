//! One-shot JSON analysis endpoint.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use super::read_file_field;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{analyze_off_thread, Report, SmearFormat, UploadedImage};

#[derive(Debug, Serialize)]
pub struct ImageSummary {
    pub file_name: String,
    pub format: SmearFormat,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub model: String,
    pub image: ImageSummary,
    pub report: Report,
    pub markdown: String,
}

/// `POST /api/analyze` - upload and analyze in one request. Not tied to a
/// browser session.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let client = ctx.client().ok_or(ApiError::NotConfigured)?;
    let part = read_file_field(multipart).await?;
    let image = UploadedImage::ingest(&part.file_name, part.content_type.as_deref(), part.bytes)?;

    let (width, height) = image.dimensions();
    let summary = ImageSummary {
        file_name: image.file_name().to_string(),
        format: image.format(),
        width,
        height,
        sha256: image.fingerprint().to_string(),
    };
    let model = client.model_id().to_string();

    let report = analyze_off_thread(client, Arc::new(image)).await?;
    let markdown = report.to_markdown();

    Ok(Json(AnalysisResponse {
        model,
        image: summary,
        report,
        markdown,
    }))
}
