use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::gemini_types::{
    ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part,
};
use super::ingest::UploadedImage;
use super::prompt::ANALYSIS_PROMPT;
use crate::config::{GeminiConfig, APP_NAME, APP_VERSION};

/// Longest service error body echoed back to the user.
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Could not reach the model service: {0}")]
    Transport(String),

    #[error("Request to the model service timed out")]
    Timeout,

    #[error("Model service returned error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Unreadable model service response: {0}")]
    Envelope(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Vision model abstraction (allows mocking).
///
/// One call per user-triggered analysis: the fixed prompt plus one image in,
/// the model's raw text out. Implementations must not retry.
pub trait ModelClient: Send + Sync {
    fn classify(&self, image: &UploadedImage) -> Result<String, ServiceError>;

    /// Model version string, for logs and the health endpoint.
    fn model_id(&self) -> &str;
}

/// Build the `generateContent` body for one smear.
pub fn build_generate_request(prompt: &str, image: &UploadedImage) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime().to_string(),
                        data: image.to_base64(),
                    },
                },
            ],
        }],
    }
}

// ──────────────────────────────────────────────
// GeminiClient
// ──────────────────────────────────────────────

/// Google Gemini adapter over blocking `reqwest`.
///
/// No client-side timeout is configured; the transport default applies.
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Must be called outside an async context (blocking client).
    pub fn new(config: GeminiConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> String {
        self.config.generate_content_url()
    }
}

impl ModelClient for GeminiClient {
    fn classify(&self, image: &UploadedImage) -> Result<String, ServiceError> {
        let body = build_generate_request(ANALYSIS_PROMPT, image);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose())
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else if e.is_connect() {
                    ServiceError::Transport(format!("connection failed: {e}"))
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: service_error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ServiceError::Envelope(e.to_string()))?;

        let text = parsed.text();
        if text.trim().is_empty() {
            tracing::warn!(
                block_reason = parsed.block_reason().unwrap_or("none"),
                finish_reason = parsed.finish_reason().unwrap_or("none"),
                candidates = parsed.candidates.len(),
                "Gemini returned no text"
            );
        }
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Pull the human-readable message out of a Gemini error body.
fn service_error_message(body: &str) -> String {
    let message = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(status) => format!("{status}: {}", env.error.message),
            None => env.error.message,
        },
        Err(_) => body.trim().to_string(),
    };
    if message.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = message.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}…")
    } else if message.is_empty() {
        "no details".to_string()
    } else {
        message
    }
}

// ──────────────────────────────────────────────
// MockModelClient
// ──────────────────────────────────────────────

/// Mock model client for testing; returns a configurable canned answer.
pub struct MockModelClient {
    response: Result<String, ServiceError>,
    model: String,
    calls: AtomicUsize,
    last_mime: Mutex<Option<String>>,
}

impl MockModelClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            model: "mock-vision".to_string(),
            calls: AtomicUsize::new(0),
            last_mime: Mutex::new(None),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            response: Err(error),
            ..Self::new("")
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// MIME type of the last image classified.
    pub fn last_mime(&self) -> Option<String> {
        self.last_mime.lock().ok().and_then(|m| m.clone())
    }
}

impl ModelClient for MockModelClient {
    fn classify(&self, image: &UploadedImage) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_mime.lock() {
            *last = Some(image.mime().to_string());
        }
        self.response.clone()
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, GEMINI_MODEL};
    use crate::pipeline::ingest::tests::sample_image;

    fn test_config() -> GeminiConfig {
        GeminiConfig::new(ApiKey::new("test-key").unwrap())
    }

    #[test]
    fn request_carries_prompt_then_image() {
        let image = sample_image();
        let req = build_generate_request(ANALYSIS_PROMPT, &image);
        let json = serde_json::to_value(&req).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], ANALYSIS_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], image.to_base64());
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn gemini_client_uses_fixed_model() {
        let client = GeminiClient::new(test_config()).unwrap();
        assert_eq!(client.model_id(), GEMINI_MODEL);
        assert!(client.endpoint().ends_with("/models/gemini-2.0-flash-exp:generateContent"));
    }

    #[test]
    fn endpoint_never_contains_key() {
        let client = GeminiClient::new(test_config()).unwrap();
        assert!(!client.endpoint().contains("test-key"));
    }

    #[test]
    fn unreachable_service_is_transport_error() {
        // Bind then release an ephemeral port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = test_config();
        config.api_base = format!("http://{addr}/v1beta");
        let client = GeminiClient::new(config).unwrap();
        let err = client.classify(&sample_image()).unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_) | ServiceError::Timeout));
    }

    #[test]
    fn error_message_from_envelope() {
        let body = r#"{"error":{"code":403,"message":"Permission denied.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(service_error_message(body), "PERMISSION_DENIED: Permission denied.");
    }

    #[test]
    fn error_message_from_plain_body() {
        assert_eq!(service_error_message("  upstream hiccup \n"), "upstream hiccup");
        assert_eq!(service_error_message(""), "no details");
    }

    #[test]
    fn error_message_is_truncated() {
        let long = "x".repeat(1000);
        let msg = service_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn mock_returns_canned_text_and_counts() {
        let client = MockModelClient::new("{}");
        assert_eq!(client.call_count(), 0);
        assert_eq!(client.classify(&sample_image()).unwrap(), "{}");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.last_mime().as_deref(), Some("image/png"));
    }

    #[test]
    fn failing_mock_returns_error() {
        let client = MockModelClient::failing(ServiceError::Timeout);
        assert_eq!(client.classify(&sample_image()).unwrap_err(), ServiceError::Timeout);
        assert_eq!(client.call_count(), 1);
    }
}
