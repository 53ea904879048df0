//! Application constants and startup configuration.
//!
//! The Gemini credential is looked up exactly once, from the secrets file, and
//! handed to the model client through an explicit `GeminiConfig`. Nothing in
//! this module is global mutable state.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Application-level constants
pub const APP_NAME: &str = "Plasmoscope";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The single hosted model version every analysis is sent to.
pub const GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Base URL of the Generative Language REST API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Local address the UI shell listens on unless the secrets file overrides it.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Gemini rejects inline image payloads above 20 MB.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Largest width or height accepted for an uploaded image.
pub const MAX_DIMENSION_PX: u32 = 16_384;

/// Largest decoded pixel count, checked from the header before decoding.
pub const MAX_IMAGE_PIXELS: u64 = 40_000_000;

const SECRETS_DIR: &str = ".plasmoscope";
const SECRETS_FILE: &str = "secrets.toml";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "plasmoscope_lib=info,plasmoscope=info,tower_http=warn"
}

/// Where the secrets file is looked up, in order.
///
/// `./.plasmoscope/secrets.toml` first, then `~/.plasmoscope/secrets.toml`.
pub fn secrets_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SECRETS_DIR).join(SECRETS_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(SECRETS_DIR).join(SECRETS_FILE));
    }
    paths
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("No secrets file found (searched: {0})")]
    SecretsNotFound(String),

    #[error("Cannot read secrets file {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Invalid secrets file {path}: {message}")]
    InvalidSecrets { path: PathBuf, message: String },

    #[error("GOOGLE_API_KEY is missing from the [gemini] section")]
    MissingApiKey,

    #[error("GOOGLE_API_KEY is blank or contains whitespace")]
    InvalidApiKey,

    #[error("Invalid bind address '{0}'")]
    InvalidBindAddr(String),
}

// ═══════════════════════════════════════════════════════════
// ApiKey
// ═══════════════════════════════════════════════════════════

/// Gemini API key. Zeroed on drop and redacted from `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let key = raw.trim();
        if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::InvalidApiKey);
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ═══════════════════════════════════════════════════════════
// Config objects
// ═══════════════════════════════════════════════════════════

/// Everything the Gemini adapter needs, passed to its constructor.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: ApiKey,
}

impl GeminiConfig {
    /// Fixed endpoint and model, caller-supplied credential.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_base: GEMINI_API_BASE.to_string(),
            model: GEMINI_MODEL.to_string(),
            api_key,
        }
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub bind_addr: SocketAddr,
}

/// On-disk shape of `secrets.toml`.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    gemini: Option<GeminiSection>,
    server: Option<ServerSection>,
}

#[derive(Debug, Deserialize)]
struct GeminiSection {
    #[serde(rename = "GOOGLE_API_KEY")]
    google_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

impl AppConfig {
    /// Load from the first secrets file found on the search path.
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = secrets_search_paths();
        let path = candidates.iter().find(|p| p.is_file()).ok_or_else(|| {
            ConfigError::SecretsNotFound(
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        })?;
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&raw).map_err(|e| match e {
            ConfigError::InvalidSecrets { message, .. } => ConfigError::InvalidSecrets {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Secrets file loaded");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let secrets: SecretsFile =
            toml::from_str(raw).map_err(|e| ConfigError::InvalidSecrets {
                path: PathBuf::from(SECRETS_FILE),
                message: e.message().to_string(),
            })?;

        let key = secrets
            .gemini
            .and_then(|g| g.google_api_key)
            .ok_or(ConfigError::MissingApiKey)?;
        let api_key = ApiKey::new(&key)?;

        let bind_addr = match secrets.server.and_then(|s| s.bind) {
            Some(bind) => parse_bind_addr(&bind)?,
            None => default_bind_addr(),
        };

        Ok(Self {
            gemini: GeminiConfig::new(api_key),
            bind_addr,
        })
    }
}

pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8501))
}

fn parse_bind_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBindAddr(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_plasmoscope() {
        assert_eq!(APP_NAME, "Plasmoscope");
    }

    #[test]
    fn default_bind_matches_constant() {
        assert_eq!(default_bind_addr().to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn search_path_starts_in_working_dir() {
        let paths = secrets_search_paths();
        assert_eq!(paths[0], PathBuf::from(".plasmoscope/secrets.toml"));
    }

    #[test]
    fn generate_url_uses_fixed_model() {
        let cfg = GeminiConfig::new(ApiKey::new("k-123").unwrap());
        assert_eq!(
            cfg.generate_content_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        let mut cfg = GeminiConfig::new(ApiKey::new("k-123").unwrap());
        cfg.api_base = "http://localhost:9999/v1beta/".into();
        assert_eq!(
            cfg.generate_content_url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let key = ApiKey::new("super-secret").unwrap();
        let shown = format!("{key:?}");
        assert!(!shown.contains("super-secret"));
        let cfg = GeminiConfig::new(key);
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }

    #[test]
    fn api_key_rejects_blank_and_whitespace() {
        assert!(matches!(ApiKey::new(""), Err(ConfigError::InvalidApiKey)));
        assert!(matches!(ApiKey::new("   "), Err(ConfigError::InvalidApiKey)));
        assert!(matches!(ApiKey::new("ab cd"), Err(ConfigError::InvalidApiKey)));
        assert_eq!(ApiKey::new("  abc \n").unwrap().expose(), "abc");
    }

    #[test]
    fn parses_minimal_secrets() {
        let cfg = AppConfig::from_toml_str("[gemini]\nGOOGLE_API_KEY = \"AIza-test\"\n").unwrap();
        assert_eq!(cfg.gemini.api_key.expose(), "AIza-test");
        assert_eq!(cfg.gemini.model, GEMINI_MODEL);
        assert_eq!(cfg.bind_addr, default_bind_addr());
    }

    #[test]
    fn parses_bind_override() {
        let cfg = AppConfig::from_toml_str(
            "[gemini]\nGOOGLE_API_KEY = \"k\"\n[server]\nbind = \"0.0.0.0:9000\"\n",
        )
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
    }

    #[test]
    fn missing_gemini_section_is_missing_key() {
        let err = AppConfig::from_toml_str("[server]\nbind = \"127.0.0.1:1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn missing_key_in_section() {
        let err = AppConfig::from_toml_str("[gemini]\nOTHER = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn blank_key_is_invalid() {
        let err = AppConfig::from_toml_str("[gemini]\nGOOGLE_API_KEY = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiKey));
    }

    #[test]
    fn bad_bind_addr_rejected() {
        let err = AppConfig::from_toml_str(
            "[gemini]\nGOOGLE_API_KEY = \"k\"\n[server]\nbind = \"not-an-addr\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr(_)));
    }

    #[test]
    fn malformed_toml_reports_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[gemini\nGOOGLE_API_KEY = ").unwrap();
        match AppConfig::from_file(&path).unwrap_err() {
            ConfigError::InvalidSecrets { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_file_reads_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[gemini]\nGOOGLE_API_KEY = \"from-file\"\n").unwrap();
        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.gemini.api_key.expose(), "from-file");
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
