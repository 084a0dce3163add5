use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::llm_client::Completer;
use crate::store::QuestionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Question/user persistence. Postgres in production, in-memory in tests.
    pub store: Arc<dyn QuestionStore>,
    /// Answer generation. `LlmClient` in production.
    pub llm: Arc<dyn Completer>,
    /// `None` when no identity provider is configured (development mode).
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}
