//! Shared types for the HTTP layer.

use std::sync::Arc;

use crate::pipeline::ModelClient;
use crate::session::SessionStore;

/// The model backend, or the reason it could not be built.
///
/// Configuration failures are detected once at startup; every later request
/// sees the same `Unavailable` state and nothing is retried.
#[derive(Clone)]
pub enum Backend {
    Ready(Arc<dyn ModelClient>),
    Unavailable(Arc<str>),
}

/// Shared context for all routes.
#[derive(Clone)]
pub struct ApiContext {
    pub backend: Backend,
    pub sessions: Arc<SessionStore>,
}

impl ApiContext {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            sessions: Arc::new(SessionStore::new()),
        }
    }

    pub fn ready(client: Arc<dyn ModelClient>) -> Self {
        Self::new(Backend::Ready(client))
    }

    pub fn unavailable(reason: impl Into<Arc<str>>) -> Self {
        Self::new(Backend::Unavailable(reason.into()))
    }

    pub fn client(&self) -> Option<Arc<dyn ModelClient>> {
        match &self.backend {
            Backend::Ready(client) => Some(client.clone()),
            Backend::Unavailable(_) => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    /// Model id for health reporting, when configured.
    pub fn model_id(&self) -> Option<String> {
        match &self.backend {
            Backend::Ready(client) => Some(client.model_id().to_string()),
            Backend::Unavailable(_) => None,
        }
    }
}
