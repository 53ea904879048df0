//! One analysis attempt, end to end.

use std::sync::Arc;
use std::time::Instant;

use super::gemini::ModelClient;
use super::ingest::UploadedImage;
use super::parser::parse_analysis;
use super::presenter::{present, Report};
use super::AnalysisError;

pub type AnalysisOutcome = Result<Report, AnalysisError>;

/// Run one attempt: a single model call, then parse and present.
///
/// Blocking. Never retries; every failure is terminal for this attempt.
pub fn analyze(client: &dyn ModelClient, image: &UploadedImage) -> AnalysisOutcome {
    let _span = tracing::info_span!(
        "smear_analysis",
        model = %client.model_id(),
        image = %image.short_fingerprint(),
    )
    .entered();
    let start = Instant::now();

    let outcome = client
        .classify(image)
        .map_err(AnalysisError::from)
        .and_then(|raw| interpret_response(&raw));

    match &outcome {
        Ok(report) => tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            presence = %report.result.presence,
            species = %report.result.species,
            linked = report.link.is_some(),
            "Analysis complete"
        ),
        Err(e) => tracing::warn!(
            elapsed_ms = %start.elapsed().as_millis(),
            code = e.code(),
            error = %e,
            "Analysis failed"
        ),
    }

    outcome
}

/// Classify raw model text into a report or a failure category.
pub fn interpret_response(raw: &str) -> AnalysisOutcome {
    if raw.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    let result = parse_analysis(raw).map_err(|e| AnalysisError::MalformedResponse {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;
    Ok(present(&result))
}

/// Run `analyze` on the blocking pool and wait for it.
///
/// The caller still experiences one synchronous request; the async worker is
/// just not tied up while the model call is outstanding.
pub async fn analyze_off_thread(
    client: Arc<dyn ModelClient>,
    image: Arc<UploadedImage>,
) -> AnalysisOutcome {
    tokio::task::spawn_blocking(move || analyze(client.as_ref(), &image))
        .await
        .unwrap_or_else(|e| Err(AnalysisError::Unexpected(format!("analysis worker failed: {e}"))))
}
