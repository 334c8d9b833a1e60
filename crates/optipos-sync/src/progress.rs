//! # Progress and Results
//!
//! A sync reports `(processed, total, success, failed)` after every batch
//! or single-row fallback so a UI can draw a progress bar, and ends with a
//! per-table [`TableReport`].

use serde::{Deserialize, Serialize};

/// Progress of one table's sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub processed: usize,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl SyncProgress {
    /// Whole-number percentage, 100 for an empty table.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed.min(self.total) * 100) / self.total) as u8
    }
}

/// Receives progress updates.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, table: &str, progress: SyncProgress);
}

impl<F> ProgressReporter for F
where
    F: Fn(&str, SyncProgress) + Send + Sync,
{
    fn report(&self, table: &str, progress: SyncProgress) {
        self(table, progress)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _table: &str, _progress: SyncProgress) {}
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of syncing one table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub table: String,
    pub success: usize,
    pub failed: usize,
    /// Rows skipped because the backend already has them.
    pub duplicates: usize,
    /// One line per failed row: `id: error`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        TableReport {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Adds the counts of a second pass over the same table.
    pub fn absorb(&mut self, other: TableReport) {
        self.success += other.success;
        self.failed += other.failed;
        self.duplicates += other.duplicates;
        self.details.extend(other.details);
    }
}

/// Outcome of a full sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub tables: Vec<TableReport>,
}

impl SyncSummary {
    pub fn success(&self) -> usize {
        self.tables.iter().map(|t| t.success).sum()
    }

    pub fn failed(&self) -> usize {
        self.tables.iter().map(|t| t.failed).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.tables.iter().map(|t| t.duplicates).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent() {
        let p = SyncProgress {
            processed: 25,
            total: 40,
            success: 20,
            failed: 5,
        };
        assert_eq!(p.percent(), 62);
        assert_eq!(SyncProgress::default().percent(), 100);
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |table: &str, progress: SyncProgress| {
            seen.lock().unwrap().push((table.to_string(), progress.processed));
        };
        reporter.report("frames", SyncProgress { processed: 3, ..Default::default() });
        assert_eq!(seen.lock().unwrap().as_slice(), &[("frames".to_string(), 3)]);
    }

    #[test]
    fn test_summary_totals() {
        let summary = SyncSummary {
            tables: vec![
                TableReport {
                    table: "frames".into(),
                    success: 35,
                    duplicates: 5,
                    ..Default::default()
                },
                TableReport {
                    table: "services".into(),
                    success: 2,
                    failed: 1,
                    details: vec!["svc-1: timeout".into()],
                    ..Default::default()
                },
            ],
        };
        assert_eq!(summary.success(), 37);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.duplicates(), 5);
        assert!(summary.has_failures());
        assert!(!summary.table("services").unwrap().is_clean());
    }
}
