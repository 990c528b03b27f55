use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use margarita_core::{CapabilitySet, ObjectId, Session};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::AuthPayload;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    pub uid: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

/// What survives a restart: the token, when it was obtained and who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub user: CachedUser,
}

impl StoredSession {
    pub fn from_payload(payload: AuthPayload, now: DateTime<Utc>) -> Self {
        Self {
            token: payload.token,
            issued_at: now,
            user: CachedUser {
                uid: payload.uid,
                name: payload.name,
                email: payload.email,
                capabilities: payload.capabilities,
            },
        }
    }

    /// Young enough to skip the renewal round trip. A token dated in the future is not
    /// trusted.
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        let age = now - self.issued_at;
        age >= Duration::zero() && age < freshness
    }

    pub fn session(&self) -> Session {
        Session {
            user_id: self.user.uid.clone(),
            name: self.user.name.clone(),
            capabilities: self.user.capabilities.clone(),
        }
    }
}

/// JSON file holding the [`StoredSession`].
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file means no session.
    pub async fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Discarding corrupt session file: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, stored: &StoredSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(stored)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn stored(issued_at: DateTime<Utc>) -> StoredSession {
        StoredSession {
            token: "tok".into(),
            issued_at,
            user: CachedUser {
                uid: ObjectId::parse("65f000000000000000000001").unwrap(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                capabilities: CapabilitySet::new(),
            },
        }
    }

    #[test]
    fn test_freshness_window() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let six_days = Duration::days(6);
        let s = stored(issued);
        assert!(s.is_fresh(issued, six_days));
        assert!(s.is_fresh(issued + Duration::days(5), six_days));
        assert!(!s.is_fresh(issued + six_days, six_days));
        assert!(!s.is_fresh(issued - Duration::hours(1), six_days));
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("nested").join("session.json"));
        assert_eq!(cache.load().await.unwrap(), None);

        let s = stored(Utc::now());
        cache.save(&s).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(s));

        cache.clear().await.unwrap();
        assert_eq!(cache.load().await.unwrap(), None);
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert_eq!(SessionCache::new(path).load().await.unwrap(), None);
    }
}
