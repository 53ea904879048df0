//! Route handlers plus the helpers they share.

pub mod analysis;
pub mod health;
pub mod page;

use axum::extract::multipart::Multipart;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::MAX_IMAGE_BYTES;
use crate::pipeline::IngestionError;
use crate::session::SESSION_COOKIE;

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// One file as received from the browser.
#[derive(Debug)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Pull the `file` field out of a multipart body. Other fields are ignored.
pub async fn read_file_field(mut multipart: Multipart) -> Result<FilePart, ApiError> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::from(IngestionError::TooLarge { max: MAX_IMAGE_BYTES })
            } else {
                ApiError::BadRequest(e.body_text())
            }
        })?;
        let Some(field) = field else {
            return Err(IngestionError::Empty.into());
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::from(IngestionError::TooLarge { max: MAX_IMAGE_BYTES })
            } else {
                tracing::warn!("Failed to read upload bytes: {e}");
                ApiError::BadRequest("Failed to read file data.".into())
            }
        })?;
        return Ok(FilePart {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
}

// ═══════════════════════════════════════════════════════════
// Session cookie
// ═══════════════════════════════════════════════════════════

/// Session id from the request cookie, if it carries a valid one.
pub fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Existing session id, or a fresh one that must be set on the response.
pub struct SessionHandle {
    pub id: Uuid,
    is_new: bool,
}

impl SessionHandle {
    pub fn resolve(headers: &HeaderMap) -> Self {
        match session_from_headers(headers) {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: Uuid::new_v4(),
                is_new: true,
            },
        }
    }

    /// Attach the `Set-Cookie` header when the session was just created.
    pub fn apply(&self, mut response: Response) -> Response {
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}
