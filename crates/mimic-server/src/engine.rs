//! Engine - the surface the HTTP layer talks to.
//!
//! Ties the script compiler, the session store and the matcher together:
//! - `load_script`: compile first, then apply under the session lock
//! - `reset_session`: drop the token's session
//! - `match_request`: match and consume under the session lock
//! - `inspect`: diagnostics snapshot

use crate::script::{compile_document, match_rules, EngineError, MatchRequest, ResponsePayload};
use crate::session::{SessionSnapshot, SessionStore};
use serde::Serialize;
use tracing::{debug, info};

/// Model ids every session accepts
pub const DEFAULT_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-instruct",
];

/// Acknowledgement of a successful script load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Rules compiled from this document
    pub loaded: usize,
    /// Rules in the session after applying the load
    pub total: usize,
    pub reset: bool,
}

/// Scripting engine shared by all request handlers
#[derive(Debug)]
pub struct Engine {
    store: SessionStore,
    default_models: Vec<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_models(DEFAULT_MODELS.iter().map(|m| m.to_string()).collect())
    }

    /// Create an engine with a custom default model list
    pub fn with_models(default_models: Vec<String>) -> Self {
        Self {
            store: SessionStore::new(),
            default_models,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Compile and apply a raw script document.
    ///
    /// The document is compiled before the session is touched, so a rejected
    /// document leaves any existing session exactly as it was.
    pub fn load_script(
        &self,
        token: &str,
        raw: &serde_json::Value,
    ) -> Result<LoadSummary, EngineError> {
        let compiled = compile_document(raw)?;
        let loaded = compiled.rules.len();

        let reset = compiled.reset;
        let total = self.store.update(token, |session| {
            let total = session.apply(compiled.rules, reset);
            if reset {
                // models follow the same replace/append rule as the rules
                session.clear_models();
            }
            session.add_models(&compiled.models);
            total
        });

        info!(
            "Loaded {} rule(s) for token (reset={}, total={})",
            loaded, reset, total
        );
        Ok(LoadSummary {
            loaded,
            total,
            reset,
        })
    }

    /// Remove the token's session entirely
    pub fn reset_session(&self, token: &str) {
        if self.store.clear(token) {
            info!("Session reset");
        } else {
            debug!("Reset requested for token without a session");
        }
    }

    /// Match a request against the token's rules, consuming the winning rule.
    pub fn match_request(
        &self,
        token: &str,
        request: &MatchRequest,
    ) -> Result<ResponsePayload, EngineError> {
        let session = self
            .store
            .get(token)
            .ok_or_else(|| EngineError::NoSession(token.to_string()))?;

        let mut rules = session.lock_rules();
        let result = match_rules(&mut rules, request);
        drop(rules);

        match &result {
            Ok(payload) => debug!(
                "Matched {} {} -> {} response",
                request.method,
                request.path,
                payload.kind()
            ),
            Err(e) => debug!("No match for {} {}: {}", request.method, request.path, e),
        }
        result
    }

    /// Models the token may use: defaults plus any added by its scripts
    pub fn models(&self, token: &str) -> Vec<String> {
        let mut models = self.default_models.clone();
        if let Some(session) = self.store.get(token) {
            for model in session.models() {
                if !models.contains(&model) {
                    models.push(model);
                }
            }
        }
        models
    }

    pub fn is_valid_model(&self, token: &str, model: &str) -> bool {
        self.default_models.iter().any(|m| m == model)
            || self
                .store
                .get(token)
                .is_some_and(|s| s.models().iter().any(|m| m == model))
    }

    /// Diagnostics snapshot of the token's session
    pub fn inspect(&self, token: &str) -> Option<SessionSnapshot> {
        self.store.get(token).map(|s| s.snapshot())
    }
}
