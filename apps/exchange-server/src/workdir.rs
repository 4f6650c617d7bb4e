//! Working Directory Manager
//!
//! Each exchange session receives its files into one directory under the
//! input root, named `YYYY-MM-DD_HH-MM-SS_<hash>`.
//!
//! With `purge_stale` on, serving an upload deletes every other directory
//! under the root. This is a cross-session side effect: an abandoned (or
//! concurrent) session loses its files as soon as another session uploads.
//! The policy assumes one active exchange per input root at a time.

use std::path::{Path, PathBuf};

use chrono::Local;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;
use crate::session::ExchangeSession;

#[derive(Debug, Clone)]
pub struct WorkingDirs {
    root: PathBuf,
    purge_stale: bool,
}

impl WorkingDirs {
    pub fn new(root: impl Into<PathBuf>, purge_stale: bool) -> Self {
        Self {
            root: root.into(),
            purge_stale,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current working directory of a session, if one was allocated
    pub fn current(&self, session: &ExchangeSession) -> Option<PathBuf> {
        session.working_dir.as_ref().map(|name| self.root.join(name))
    }

    /// Allocate the session's working directory on first use
    pub async fn ensure(&self, session: &mut ExchangeSession) -> Result<String> {
        if let Some(name) = session.working_dir.as_ref().filter(|n| !n.is_empty()) {
            let path = self.root.join(name);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tokio::fs::create_dir_all(&path).await?;
            }
            return Ok(name.clone());
        }

        let name = new_dir_name();
        let path = self.root.join(&name);
        tokio::fs::create_dir_all(&path).await?;

        tracing::info!(path = %path.display(), "Created exchange working directory");

        session.working_dir = Some(name.clone());
        Ok(name)
    }

    /// Resolve `file_name` inside the session's working directory.
    ///
    /// `purge` applies the stale-directory policy; uploads pass `true`.
    pub async fn resolve(
        &self,
        session: &mut ExchangeSession,
        file_name: &str,
        purge: bool,
    ) -> Result<PathBuf> {
        let dir = self.ensure(session).await?;

        if purge && self.purge_stale {
            self.purge_except(&dir).await?;
        }

        Ok(self.root.join(dir).join(file_name))
    }

    /// Delete every directory under the root except `current`
    ///
    /// Returns the number of directories removed
    pub async fn purge_except(&self, current: &str) -> Result<usize> {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if entry.file_name().to_string_lossy() == current {
                continue;
            }

            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(path = %entry.path().display(), "Purged stale working directory");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Failed to purge stale working directory"
                    );
                }
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, "Purged stale exchange directories");
        }

        Ok(removed)
    }
}

/// Reduce a client supplied file name to a bare name.
///
/// Directory components (either separator) are dropped; `.`/`..` and
/// names with control characters are rejected.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if name.chars().any(|c| c.is_control()) {
        return None;
    }

    Some(name.to_string())
}

/// Unique working directory name: local timestamp plus a random hash
pub fn new_dir_name() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    let hash = hex::encode(hasher.finalize());

    format!("{}_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"), &hash[..32])
}
