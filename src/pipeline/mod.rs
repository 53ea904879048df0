//! Smear analysis pipeline.
//!
//! Ingestion → model call (prompt + image) → code fence unwrap → JSON parse →
//! report. Each stage owns its error type; `AnalysisError` is the taxonomy the
//! UI shell sees, one variant per user-visible failure category.

pub mod fence;
pub mod gemini;
pub mod gemini_types;
pub mod ingest;
pub mod orchestrator;
pub mod parser;
pub mod presenter;
pub mod prompt;
pub mod species;

pub use gemini::{GeminiClient, MockModelClient, ModelClient, ServiceError};
pub use ingest::{IngestionError, SmearFormat, UploadedImage};
pub use orchestrator::{analyze, analyze_off_thread, interpret_response, AnalysisOutcome};
pub use parser::{AnalysisResult, Confidence, Parasitemia, ParseError, Presence};
pub use presenter::{present, ReferenceLink, Report, ReportLine};

use thiserror::Error;

/// Failure of one analysis attempt. Terminal for the attempt, never for the
/// session; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Could not read image: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Analysis failed: {0}")]
    Service(#[from] ServiceError),

    #[error("No response received")]
    EmptyResponse,

    #[error("Failed to parse analysis response ({reason})")]
    MalformedResponse { reason: String, raw: String },

    #[error("Analysis failed: {0}")]
    Unexpected(String),
}

impl AnalysisError {
    /// Stable machine-readable category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ingestion(_) => "INGESTION_ERROR",
            Self::Service(_) => "SERVICE_ERROR",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// The offending model output, shown verbatim next to a parse failure.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            AnalysisError::Ingestion(IngestionError::Empty),
            AnalysisError::Service(ServiceError::Timeout),
            AnalysisError::EmptyResponse,
            AnalysisError::MalformedResponse {
                reason: "x".into(),
                raw: "y".into(),
            },
            AnalysisError::Unexpected("z".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_are_distinct_per_category() {
        assert_eq!(AnalysisError::EmptyResponse.to_string(), "No response received");
        let malformed = AnalysisError::MalformedResponse {
            reason: "invalid JSON".into(),
            raw: "{".into(),
        };
        assert!(malformed.to_string().starts_with("Failed to parse analysis response"));
        assert_eq!(malformed.raw_output(), Some("{"));
        assert!(AnalysisError::Service(ServiceError::Timeout)
            .to_string()
            .starts_with("Analysis failed"));
    }

    #[test]
    fn only_malformed_carries_raw_output() {
        assert_eq!(AnalysisError::EmptyResponse.raw_output(), None);
        assert_eq!(AnalysisError::Unexpected("boom".into()).raw_output(), None);
    }
}
