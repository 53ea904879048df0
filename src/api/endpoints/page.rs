//! HTML page handlers: view, upload, analyze.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use super::{read_file_field, SessionHandle};
use crate::api::error::ApiError;
use crate::api::page::{render_page, PageModel};
use crate::api::types::ApiContext;
use crate::pipeline::{analyze_off_thread, AnalysisError, AnalysisOutcome, UploadedImage};
use crate::session::SessionView;

/// `GET /` - the page for this session.
pub async fn index(State(ctx): State<ApiContext>, headers: HeaderMap) -> Response {
    let handle = SessionHandle::resolve(&headers);
    if let Err(e) = ctx.sessions.evict_idle() {
        return handle.apply(page_response(&ctx, &SessionView::default(), Some(e.into())));
    }
    let response = match ctx.sessions.snapshot(handle.id) {
        Ok(view) => page_response(&ctx, &view, None),
        Err(e) => page_response(&ctx, &SessionView::default(), Some(e.into())),
    };
    handle.apply(response)
}

/// `POST /upload` - ingest one image into the session.
pub async fn upload(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let handle = SessionHandle::resolve(&headers);
    let error = store_upload(&ctx, &handle, multipart).await.err();
    handle.apply(render_current(&ctx, &handle, error))
}

async fn store_upload(
    ctx: &ApiContext,
    handle: &SessionHandle,
    multipart: Multipart,
) -> Result<(), ApiError> {
    if !ctx.is_configured() {
        return Err(ApiError::NotConfigured);
    }
    ctx.sessions.evict_idle()?;
    let ingested = match read_file_field(multipart).await {
        Ok(part) => {
            UploadedImage::ingest(&part.file_name, part.content_type.as_deref(), part.bytes)
        }
        Err(ApiError::Analysis(AnalysisError::Ingestion(e))) => Err(e),
        Err(other) => return Err(other),
    };
    match ingested {
        Ok(image) => ctx.sessions.store_image(handle.id, image)?,
        Err(e) => {
            tracing::info!(error = %e, "Upload rejected");
            ctx.sessions.record_upload_failure(handle.id, e.clone())?;
            return Err(e.into());
        }
    }
    Ok(())
}

/// `POST /analyze` - one attempt on the held image.
pub async fn analyze(State(ctx): State<ApiContext>, headers: HeaderMap) -> Response {
    let handle = SessionHandle::resolve(&headers);
    let error = run_attempt(&ctx, &handle).await.err();
    handle.apply(render_current(&ctx, &handle, error))
}

async fn run_attempt(ctx: &ApiContext, handle: &SessionHandle) -> Result<(), ApiError> {
    let client = ctx.client().ok_or(ApiError::NotConfigured)?;
    ctx.sessions.evict_idle()?;
    let image = ctx.sessions.begin_analysis(handle.id)?;

    // The attempt is recorded even if the browser goes away mid-request.
    let sessions = ctx.sessions.clone();
    let id = handle.id;
    let outcome: AnalysisOutcome = tokio::spawn(async move {
        let outcome = analyze_off_thread(client, image).await;
        if let Err(e) = sessions.finish_analysis(id, outcome.clone()) {
            tracing::error!(error = %e, "Could not record analysis outcome");
        }
        outcome
    })
    .await
    .unwrap_or_else(|e| Err(AnalysisError::Unexpected(format!("analysis task failed: {e}"))));

    outcome.map(|_| ()).map_err(ApiError::from)
}

/// Render the session after a request, with the request's status code.
fn render_current(ctx: &ApiContext, handle: &SessionHandle, error: Option<ApiError>) -> Response {
    match ctx.sessions.snapshot(handle.id) {
        Ok(view) => page_response(ctx, &view, error),
        Err(e) => page_response(ctx, &SessionView::default(), Some(e.into())),
    }
}

fn page_response(ctx: &ApiContext, view: &SessionView, error: Option<ApiError>) -> Response {
    let status = error.as_ref().map(ApiError::status).unwrap_or(StatusCode::OK);
    // Attempt failures and upload rejections are already part of the session view.
    let notice = match &error {
        Some(e @ (ApiError::Session(_) | ApiError::BadRequest(_) | ApiError::Internal(_))) => {
            Some(e.parts().2)
        }
        _ => None,
    };
    let html = render_page(&PageModel {
        session: view,
        configured: ctx.is_configured(),
        notice: notice.as_deref(),
    });
    (status, Html(html)).into_response()
}
