//! The pipeline run lock.
//!
//! A `.publish.lock` file at the workspace root prevents two pipelines from
//! mutating the same tree concurrently. The lock records who holds it; a
//! stale lock (holder gone or timeout exceeded) may be reclaimed. This is a
//! process-local guard, not a distributed mutex.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LockError, Result};

/// Name of the lock file at the workspace root.
pub const LOCK_FILE: &str = ".publish.lock";

const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;

/// Contents of the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    /// Holder process id
    pub pid: u32,
    /// When the lock was taken
    pub created_at: DateTime<Utc>,
    /// Holder hostname
    pub hostname: String,
    /// Seconds after which the lock counts as stale
    pub timeout: u64,
}

impl LockInfo {
    fn current(timeout: u64) -> Self {
        Self {
            pid: std::process::id(),
            created_at: Utc::now(),
            hostname: hostname(),
            timeout,
        }
    }

    /// Whether this lock can be reclaimed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        if age.num_seconds() < 0 {
            return false;
        }
        #[allow(clippy::cast_sign_loss)]
        if age.num_seconds() as u64 > self.timeout {
            return true;
        }

        // On Linux a vanished holder process makes the lock stale early.
        #[cfg(target_os = "linux")]
        {
            if self.hostname == hostname() && !Path::new(&format!("/proc/{}", self.pid)).exists()
            {
                return true;
            }
        }

        false
    }
}

/// Guard for a held pipeline lock; releases the lock file on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Explicitly releases the lock.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove lock file {}: {e}", self.path.display());
                }
            }
            self.released = true;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Release on every exit path, panics included.
        self.remove();
    }
}

/// Acquires the pipeline lock for a workspace root.
///
/// # Errors
///
/// Fails with `LockError::Held` when a live lock exists, or `LockError::Io`
/// when the lock file cannot be read or written.
pub async fn acquire(root: &Path, timeout_secs: Option<u64>) -> Result<LockGuard> {
    let path = root.join(LOCK_FILE);

    if path.exists() {
        let content = tokio::fs::read_to_string(&path).await.map_err(|source| {
            LockError::Io { path: path.display().to_string(), source }
        })?;

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) if !existing.is_stale() => {
                return Err(LockError::Held {
                    pid: existing.pid,
                    hostname: existing.hostname,
                    since: existing.created_at.to_rfc3339(),
                }
                .into());
            }
            Ok(existing) => {
                log::warn!(
                    "Reclaiming stale publish lock held by pid {} since {}",
                    existing.pid,
                    existing.created_at.to_rfc3339()
                );
            }
            Err(_) => {
                log::warn!("Reclaiming unreadable publish lock at {}", path.display());
            }
        }
    }

    let info = LockInfo::current(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let mut rendered = serde_json::to_string_pretty(&info)
        .unwrap_or_else(|_| "{}".to_string());
    rendered.push('\n');

    tokio::fs::write(&path, rendered).await.map_err(|source| LockError::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(LockGuard { path, released: false })
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_writes_and_release_removes() {
        let dir = tempfile::tempdir().expect("tempdir");

        let guard = acquire(dir.path(), None).await.expect("acquire");
        let lock_path = dir.path().join(LOCK_FILE);
        assert!(lock_path.exists());

        let content = tokio::fs::read_to_string(&lock_path).await.expect("read lock");
        let info: LockInfo = serde_json::from_str(&content).expect("parse lock");
        assert_eq!(info.pid, std::process::id());

        guard.release();
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().expect("tempdir");

        let _guard = acquire(dir.path(), None).await.expect("first acquire");
        let second = acquire(dir.path(), None).await;

        // The second caller is this same (live) process, so the lock holds.
        assert!(matches!(
            second,
            Err(crate::error::Error::Lock(LockError::Held { .. }))
        ));
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lock_path = dir.path().join(LOCK_FILE);

        let stale = LockInfo {
            pid: 1,
            created_at: Utc::now() - chrono::Duration::hours(2),
            hostname: "elsewhere".to_string(),
            timeout: 60,
        };
        tokio::fs::write(&lock_path, serde_json::to_string(&stale).expect("render"))
            .await
            .expect("seed stale lock");

        let guard = acquire(dir.path(), None).await.expect("reclaim");
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn test_guard_drop_releases() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let _guard = acquire(dir.path(), None).await.expect("acquire");
        }
        assert!(!dir.path().join(LOCK_FILE).exists());
    }
}
