//! Exchange session types

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated exchange user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub login: String,
}

impl Principal {
    pub fn new(login: impl Into<String>) -> Self {
        Self { login: login.into() }
    }
}

/// Server-side state of one client's checkauth..complete sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSession {
    /// Name of the working directory under the input root
    pub working_dir: Option<String>,

    /// Received files that still need to be unpacked (file name -> path)
    pub pending_archives: BTreeMap<String, PathBuf>,

    /// Per-file import attempt counters
    pub import_progress: HashMap<String, u32>,

    /// Bound user, if authenticated
    pub principal: Option<Principal>,

    /// Anti-forgery token
    pub csrf_token: String,

    /// Free-form values for collaborators
    pub values: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ExchangeSession {
    pub fn new(lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            working_dir: None,
            pending_archives: BTreeMap::new(),
            import_progress: HashMap::new(),
            principal: None,
            csrf_token: new_token(),
            values: BTreeMap::new(),
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn touch(&mut self, lifetime: Duration) {
        self.expires_at = Utc::now() + lifetime;
    }

    /// Drop all data, keeping only timestamps
    pub fn flush(&mut self) {
        self.working_dir = None;
        self.pending_archives.clear();
        self.import_progress.clear();
        self.principal = None;
        self.values.clear();
    }

    pub fn regenerate_token(&mut self) {
        self.csrf_token = new_token();
    }

    /// Increment and return the attempt counter of `file_name`
    pub fn bump_progress(&mut self, file_name: &str) -> u32 {
        let counter = self.import_progress.entry(file_name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn progress_of(&self, file_name: &str) -> u32 {
        self.import_progress.get(file_name).copied().unwrap_or(0)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }
}

/// Random opaque token, used for session ids and anti-forgery tokens
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Whether a client supplied session id is acceptable as a store key
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_progress_is_per_file() {
        let mut session = ExchangeSession::new(Duration::minutes(10));
        assert_eq!(session.bump_progress("import.xml"), 1);
        assert_eq!(session.bump_progress("import.xml"), 2);
        assert_eq!(session.bump_progress("offers.xml"), 1);
        assert_eq!(session.progress_of("import.xml"), 2);
        assert_eq!(session.progress_of("missing.xml"), 0);
    }

    #[test]
    fn test_flush_keeps_token_until_regenerated() {
        let mut session = ExchangeSession::new(Duration::minutes(10));
        session.working_dir = Some("dir".into());
        session.principal = Some(Principal::new("admin"));
        let token = session.csrf_token.clone();

        session.flush();
        assert!(session.working_dir.is_none());
        assert!(session.principal.is_none());
        assert_eq!(session.csrf_token, token);

        session.regenerate_token();
        assert_ne!(session.csrf_token, token);
    }

    #[test]
    fn test_session_id_validation() {
        assert!(is_valid_session_id("abcDEF123"));
        assert!(is_valid_session_id(&new_token()));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("a;b"));
        assert!(!is_valid_session_id("../etc"));
    }
}
