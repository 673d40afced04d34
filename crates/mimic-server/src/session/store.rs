//! SessionStore - per-token isolation of scripted rule lists.
//!
//! The top-level map is behind a `RwLock` that is only held for create, lookup
//! and delete. Each session owns its own mutex over its rules, so tokens never
//! block each other on rule state.

use crate::script::{Rule, RuleSnapshot};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-token session state
#[derive(Debug)]
pub struct Session {
    token: String,
    rules: Mutex<Vec<Rule>>,
    /// Extra model ids added by scripts for this token
    models: Mutex<Vec<String>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            rules: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    /// Acquire the session's exclusive lock over its rules
    pub fn lock_rules(&self) -> MutexGuard<'_, Vec<Rule>> {
        self.rules.lock()
    }

    /// Replace (`reset`) or append to the rule list under the session lock
    pub fn apply(&self, rules: Vec<Rule>, reset: bool) -> usize {
        let mut current = self.rules.lock();
        if reset {
            *current = rules;
        } else {
            current.extend(rules);
        }
        current.len()
    }

    /// Add model ids, skipping ones already present
    pub fn add_models(&self, models: &[String]) {
        let mut current = self.models.lock();
        for model in models {
            if !current.contains(model) {
                current.push(model.clone());
            }
        }
    }

    pub fn clear_models(&self) {
        self.models.lock().clear();
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().clone()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().len()
    }

    /// Point-in-time copy of the session for diagnostics
    pub fn snapshot(&self) -> SessionSnapshot {
        let rules = self.rules.lock();
        SessionSnapshot {
            token: self.token.clone(),
            created_at: self.created_at.to_rfc3339(),
            rule_count: rules.len(),
            eligible_count: rules.iter().filter(|r| r.is_eligible()).count(),
            rules: rules
                .iter()
                .enumerate()
                .map(|(idx, rule)| RuleSnapshot::from_rule(idx, rule))
                .collect(),
            models: self.models(),
        }
    }
}

/// Serializable snapshot returned by the state endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub token: String,
    pub created_at: String,
    pub rule_count: usize,
    pub eligible_count: usize,
    pub rules: Vec<RuleSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

/// Maps opaque client tokens to isolated sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing session or create an empty one.
    ///
    /// Double-checked: the fast path only takes the read lock; the slow path
    /// re-checks under the write lock so concurrent first requests for the same
    /// token all observe a single `Session`.
    pub fn get_or_create(&self, token: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().get(token) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        let session = sessions.entry(token.to_string()).or_insert_with(|| {
            debug!("Creating session for token {}", token);
            Arc::new(Session::new(token))
        });
        Arc::clone(session)
    }

    /// Non-creating lookup
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(token).cloned()
    }

    /// Run `f` on the token's session (created if needed) while the session is
    /// still registered. `clear` for any token waits until `f` returns, so the
    /// update cannot land on a session that was removed underneath it.
    pub fn update<R>(&self, token: &str, f: impl FnOnce(&Session) -> R) -> R {
        let sessions = self.sessions.upgradable_read();
        let (sessions, session) = match sessions.get(token).cloned() {
            Some(session) => (RwLockUpgradableReadGuard::downgrade(sessions), session),
            None => {
                let mut sessions = RwLockUpgradableReadGuard::upgrade(sessions);
                debug!("Creating session for token {}", token);
                let session = Arc::new(Session::new(token));
                sessions.insert(token.to_string(), Arc::clone(&session));
                (RwLockWriteGuard::downgrade(sessions), session)
            }
        };
        let result = f(&session);
        drop(sessions);
        result
    }

    /// Replace or append rules for a token, creating the session if needed.
    /// Returns the resulting rule count.
    pub fn load(&self, token: &str, rules: Vec<Rule>, reset: bool) -> usize {
        self.update(token, |session| session.apply(rules, reset))
    }

    /// Remove the token's session entirely
    pub fn clear(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
