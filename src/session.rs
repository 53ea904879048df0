//! Per-browser analysis sessions.
//!
//! Each browser tab holding the session cookie owns one held image and the
//! outcome of its latest attempt. Sessions live in memory only and are
//! dropped after an idle period, except while a model call is outstanding.
//!
//! Attempt lifecycle:
//! Idle → ImageLoaded → Requesting → {Parsed | RequestFailed | ParseFailed | EmptyResponse}.
//! A new upload from any non-requesting state starts over at ImageLoaded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::{AnalysisError, AnalysisOutcome, IngestionError, UploadedImage};

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "plasmoscope_session";

/// Sessions untouched for this long are evicted.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

// ═══════════════════════════════════════════════════════════
// AttemptState
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    ImageLoaded,
    Requesting,
    Parsed,
    RequestFailed,
    ParseFailed,
    EmptyResponse,
}

impl AttemptState {
    /// Terminal state reached by a finished attempt.
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        match outcome {
            Ok(_) => Self::Parsed,
            Err(AnalysisError::EmptyResponse) => Self::EmptyResponse,
            Err(AnalysisError::MalformedResponse { .. }) => Self::ParseFailed,
            Err(AnalysisError::Service(_)) | Err(AnalysisError::Unexpected(_)) => {
                Self::RequestFailed
            }
            Err(AnalysisError::Ingestion(_)) => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("An analysis is already in progress for this session")]
    AnalysisInProgress,

    #[error("Upload an image before starting the analysis")]
    NoImage,

    #[error("Session store lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════

struct Session {
    state: AttemptState,
    image: Option<Arc<UploadedImage>>,
    outcome: Option<AnalysisOutcome>,
    upload_error: Option<IngestionError>,
    analyzed_at: Option<DateTime<Utc>>,
    last_seen: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            state: AttemptState::Idle,
            image: None,
            outcome: None,
            upload_error: None,
            analyzed_at: None,
            last_seen: Instant::now(),
        }
    }

    fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            image: self.image.clone(),
            outcome: self.outcome.clone(),
            upload_error: self.upload_error.clone(),
            analyzed_at: self.analyzed_at,
        }
    }
}

/// Read-only copy of a session, for rendering.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub state: AttemptState,
    pub image: Option<Arc<UploadedImage>>,
    pub outcome: Option<AnalysisOutcome>,
    pub upload_error: Option<IngestionError>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl Default for SessionView {
    fn default() -> Self {
        Session::new().view()
    }
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Session>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::LockPoisoned)
    }

    /// Current view of a session. Unknown ids read as a fresh Idle session.
    pub fn snapshot(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let mut sessions = self.lock()?;
        Ok(match sessions.get_mut(&id) {
            Some(session) => {
                session.last_seen = Instant::now();
                session.view()
            }
            None => SessionView::default(),
        })
    }

    /// Hold a freshly ingested image, discarding the previous attempt.
    pub fn store_image(&self, id: Uuid, image: UploadedImage) -> Result<(), SessionError> {
        let mut sessions = self.lock()?;
        let session = sessions.entry(id).or_insert_with(Session::new);
        if session.state == AttemptState::Requesting {
            return Err(SessionError::AnalysisInProgress);
        }
        session.image = Some(Arc::new(image));
        session.outcome = None;
        session.upload_error = None;
        session.analyzed_at = None;
        session.state = AttemptState::ImageLoaded;
        session.last_seen = Instant::now();
        Ok(())
    }

    /// A rejected upload clears the held image and keeps the error for display.
    pub fn record_upload_failure(
        &self,
        id: Uuid,
        error: IngestionError,
    ) -> Result<(), SessionError> {
        let mut sessions = self.lock()?;
        let session = sessions.entry(id).or_insert_with(Session::new);
        if session.state == AttemptState::Requesting {
            return Err(SessionError::AnalysisInProgress);
        }
        session.image = None;
        session.outcome = None;
        session.analyzed_at = None;
        session.upload_error = Some(error);
        session.state = AttemptState::Idle;
        session.last_seen = Instant::now();
        Ok(())
    }

    /// Move to Requesting and hand out the held image.
    ///
    /// At most one attempt per session may be outstanding.
    pub fn begin_analysis(&self, id: Uuid) -> Result<Arc<UploadedImage>, SessionError> {
        let mut sessions = self.lock()?;
        let session = sessions.get_mut(&id).ok_or(SessionError::NoImage)?;
        if session.state == AttemptState::Requesting {
            return Err(SessionError::AnalysisInProgress);
        }
        let image = session.image.clone().ok_or(SessionError::NoImage)?;
        session.state = AttemptState::Requesting;
        session.outcome = None;
        session.last_seen = Instant::now();
        Ok(image)
    }

    /// Record a finished attempt and return the terminal state.
    pub fn finish_analysis(
        &self,
        id: Uuid,
        outcome: AnalysisOutcome,
    ) -> Result<AttemptState, SessionError> {
        let mut sessions = self.lock()?;
        let session = sessions.entry(id).or_insert_with(Session::new);
        let state = AttemptState::from_outcome(&outcome);
        session.state = state;
        session.outcome = Some(outcome);
        session.analyzed_at = Some(Utc::now());
        session.last_seen = Instant::now();
        Ok(state)
    }

    /// Drop sessions idle past the TTL. Requesting sessions are kept.
    pub fn evict_idle(&self) -> Result<usize, SessionError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        let ttl = self.idle_ttl;
        sessions.retain(|_, s| {
            s.state == AttemptState::Requesting || s.last_seen.elapsed() < ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
