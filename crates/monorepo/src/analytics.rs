//! Append-only persistence of publish runs plus derived statistics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Directory under the workspace root that holds orchestrator state.
pub const STATE_DIR: &str = ".publisher";

/// Records file inside [`STATE_DIR`].
pub const RECORDS_FILE: &str = "publish-records.json";

/// One persisted publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    /// Unique record id
    pub id: String,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// The run's calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Names of the packages in the selection
    pub packages: Vec<String>,
    /// Whether the run succeeded
    pub success: bool,
    /// Total run duration in milliseconds
    pub duration_ms: u64,
    /// Number of packages in the selection
    pub package_count: usize,
    /// First fatal error, when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The release commit, when one was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl PublishRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        packages: Vec<String>,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
        commit: Option<String>,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            date: timestamp.format("%Y-%m-%d").to_string(),
            package_count: packages.len(),
            packages,
            success,
            duration_ms,
            error,
            commit,
        }
    }
}

/// Derived statistics over all records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatistics {
    /// Total recorded runs
    pub total: usize,
    /// Runs that succeeded
    pub successful: usize,
    /// Runs that failed
    pub failed: usize,
    /// Success percentage, two decimals
    pub success_rate: f64,
    /// Mean run duration in milliseconds, rounded
    pub avg_duration_ms: u64,
    /// Total packages across all runs
    pub total_packages: usize,
    /// Fastest run
    pub fastest: Option<PublishRecord>,
    /// Slowest run
    pub slowest: Option<PublishRecord>,
    /// Run counts by `YYYY-MM-DD`
    pub by_date: BTreeMap<String, usize>,
    /// Run counts by `YYYY-MM`
    pub by_month: BTreeMap<String, usize>,
}

/// Append-only JSON store of publish records.
#[derive(Debug, Clone)]
pub struct AnalyticsStore {
    path: PathBuf,
}

impl AnalyticsStore {
    /// Creates a store rooted at the workspace.
    #[must_use]
    pub fn new(workspace_root: &Path) -> Self {
        Self { path: workspace_root.join(STATE_DIR).join(RECORDS_FILE) }
    }

    /// Path of the records file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all records; a missing file is an empty store.
    pub async fn all(&self) -> Result<Vec<PublishRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            AnalyticsError::Io { path: self.path.display().to_string(), source }
        })?;

        serde_json::from_str(&content).map_err(|e| {
            AnalyticsError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Appends one record.
    ///
    /// Appends are serialized by the single-writer pipeline; the whole array
    /// is rewritten because the store is a JSON document.
    pub async fn append(&self, record: PublishRecord) -> Result<()> {
        let mut records = self.all().await?;
        records.push(record);
        self.write(&records).await
    }

    /// The last `n` records, newest first.
    pub async fn recent(&self, n: usize) -> Result<Vec<PublishRecord>> {
        let mut records = self.all().await?;
        records.reverse();
        records.truncate(n);
        Ok(records)
    }

    /// Truncates the store.
    pub async fn clear(&self) -> Result<()> {
        self.write(&[]).await
    }

    /// Computes statistics over all records.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub async fn statistics(&self) -> Result<PublishStatistics> {
        let records = self.all().await?;

        let total = records.len();
        let successful = records.iter().filter(|r| r.success).count();
        let failed = total - successful;

        let success_rate = if total == 0 {
            0.0
        } else {
            (successful as f64 / total as f64 * 10_000.0).round() / 100.0
        };

        let avg_duration_ms = if total == 0 {
            0
        } else {
            let sum: u128 = records.iter().map(|r| u128::from(r.duration_ms)).sum();
            ((sum as f64) / (total as f64)).round() as u64
        };

        let total_packages = records.iter().map(|r| r.package_count).sum();

        let fastest = records.iter().min_by_key(|r| r.duration_ms).cloned();
        let slowest = records.iter().max_by_key(|r| r.duration_ms).cloned();

        let mut by_date: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_month: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            *by_date.entry(record.date.clone()).or_default() += 1;
            let month = record.date.chars().take(7).collect::<String>();
            *by_month.entry(month).or_default() += 1;
        }

        Ok(PublishStatistics {
            total,
            successful,
            failed,
            success_rate,
            avg_duration_ms,
            total_packages,
            fastest,
            slowest,
            by_date,
            by_month,
        })
    }

    async fn write(&self, records: &[PublishRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| AnalyticsError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        }

        let mut rendered =
            serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
        rendered.push('\n');

        tokio::fs::write(&self.path, rendered).await.map_err(|source| {
            AnalyticsError::Io { path: self.path.display().to_string(), source }.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, duration_ms: u64, date: &str) -> PublishRecord {
        let mut record = PublishRecord::new(
            vec!["a".to_string(), "b".to_string()],
            success,
            duration_ms,
            None,
            None,
        );
        record.date = date.to_string();
        record
    }

    #[tokio::test]
    async fn test_append_and_recent_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AnalyticsStore::new(dir.path());

        store.append(record(true, 100, "2026-07-30")).await.expect("append 1");
        store.append(record(false, 200, "2026-07-31")).await.expect("append 2");
        store.append(record(true, 300, "2026-08-01")).await.expect("append 3");

        let recent = store.recent(2).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].duration_ms, 300);
        assert_eq!(recent[1].duration_ms, 200);
    }

    #[tokio::test]
    async fn test_statistics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AnalyticsStore::new(dir.path());

        store.append(record(true, 100, "2026-07-31")).await.expect("append");
        store.append(record(true, 200, "2026-08-01")).await.expect("append");
        store.append(record(false, 330, "2026-08-01")).await.expect("append");

        let stats = store.statistics().await.expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.success_rate - 66.67).abs() < f64::EPSILON);
        assert_eq!(stats.avg_duration_ms, 210);
        assert_eq!(stats.total_packages, 6);
        assert_eq!(stats.fastest.as_ref().map(|r| r.duration_ms), Some(100));
        assert_eq!(stats.slowest.as_ref().map(|r| r.duration_ms), Some(330));
        assert_eq!(stats.by_date.get("2026-08-01"), Some(&2));
        assert_eq!(stats.by_month.get("2026-08"), Some(&3));
        assert_eq!(stats.by_month.get("2026-07"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_store_statistics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AnalyticsStore::new(dir.path());

        let stats = store.statistics().await.expect("stats");
        assert_eq!(stats.total, 0);
        assert!((stats.success_rate - 0.0).abs() < f64::EPSILON);
        assert!(stats.fastest.is_none());
    }

    #[tokio::test]
    async fn test_clear_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AnalyticsStore::new(dir.path());

        store.append(record(true, 100, "2026-08-01")).await.expect("append");
        store.clear().await.expect("clear");

        assert!(store.all().await.expect("all").is_empty());
    }
}
