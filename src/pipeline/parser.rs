use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fence::unwrap_code_fence;

/// Keys the model must return, in schema order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "presence",
    "species",
    "stage",
    "parasitemia",
    "confidence",
    "rationale",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has the wrong type: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Macro to generate a vocabulary enum that keeps unknown values verbatim.
///
/// The model is asked for a fixed vocabulary but nothing forces it to comply;
/// anything else lands in `Other` and is shown as-is.
macro_rules! vocab_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $s,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($s => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocab_enum!(
    /// Whether parasites were seen.
    Presence {
        Yes => "yes",
        No => "no",
    }
);

vocab_enum!(
    /// Qualitative share of infected red cells.
    Parasitemia {
        Low => "low",
        Medium => "medium",
        High => "high",
        Unknown => "unknown",
    }
);

vocab_enum!(
    /// The model's self-reported certainty.
    Confidence {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

/// The model's structured answer for one smear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub presence: Presence,
    /// One of the five species names, "unknown", or whatever the model said.
    pub species: String,
    pub stage: Vec<String>,
    pub parasitemia: Parasitemia,
    pub confidence: Confidence,
    pub rationale: String,
}

/// Parse raw model output into an `AnalysisResult`.
///
/// Unwraps an optional JSON code fence first, then parses what remains.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ParseError> {
    parse_analysis_json(unwrap_code_fence(raw))
}

/// Parse an already-unwrapped JSON document.
///
/// All six keys must be present. A missing key fails the whole parse; no
/// field is ever defaulted.
pub fn parse_analysis_json(body: &str) -> Result<AnalysisResult, ParseError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ParseError::NotAnObject(json_kind(&value)))?;

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(ParseError::MissingField(*missing));
    }

    Ok(AnalysisResult {
        presence: field(object, "presence")?,
        species: field(object, "species")?,
        stage: field(object, "stage")?,
        parasitemia: field(object, "parasitemia")?,
        confidence: field(object, "confidence")?,
        rationale: field(object, "rationale")?,
    })
}

fn field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    name: &'static str,
) -> Result<T, ParseError> {
    let value = object.get(name).ok_or(ParseError::MissingField(name))?;
    T::deserialize(value).map_err(|e| ParseError::InvalidField {
        field: name,
        message: e.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
