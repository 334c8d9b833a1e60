//! # Sync State
//!
//! Wraps the sync engine and the status the frontend polls.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            SyncState                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐      ┌──────────────────────────────────────┐  │
//! │  │ SyncEngine<B>       │      │ SyncStatusDto                        │  │
//! │  │ (None when offline  │ ───► │ • mode, configured, isRunning        │  │
//! │  │  or unconfigured)   │      │ • progress of the current table      │  │
//! │  └─────────────────────┘      │ • lastSyncAt, lastSummary, error     │  │
//! │                               └──────────────────────────────────────┘  │
//! │                                                                         │
//! │  Callers: sync commands (manual) and the background loop (auto mode)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use optipos_core::catalog::Frame;
use optipos_core::{LocalizedText, Snapshot};
use optipos_sync::{
    RemoteBackend, RestBackend, SyncConfig, SyncEngine, SyncError, SyncMode, SyncProgress,
    SyncResult, SyncSummary, TableReport,
};

use crate::error::{ApiError, ApiResult};

/// Status snapshot for the frontend.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusDto {
    pub mode: String,

    /// A backend URL and key are present and sync is not offline.
    pub configured: bool,

    pub is_running: bool,

    /// Table being pushed right now.
    pub current_table: Option<String>,
    pub progress: Option<SyncProgress>,

    /// Last finished sync (ISO8601).
    pub last_sync_at: Option<String>,
    pub last_summary: Option<SyncSummary>,

    /// Toast text for the last failure.
    pub error: Option<LocalizedText>,
}

pub struct SyncState<B = RestBackend> {
    engine: Option<SyncEngine<B>>,
    mode: SyncMode,
    status: RwLock<SyncStatusDto>,
}

impl SyncState<RestBackend> {
    /// Builds the REST engine from config. Offline mode or a missing
    /// backend leaves sync disabled rather than failing startup.
    pub fn from_config(config: SyncConfig) -> Self {
        let mode = config.mode();
        if !config.is_sync_enabled() {
            info!("Sync disabled (offline mode)");
            return SyncState::disabled(mode);
        }

        match RestBackend::new(&config.backend) {
            Ok(backend) => SyncState::with_engine(SyncEngine::new(backend, config)),
            Err(e) => {
                warn!(error = %e, "Sync backend not configured, sync disabled");
                SyncState::disabled(mode)
            }
        }
    }
}

impl<B: RemoteBackend> SyncState<B> {
    pub fn with_engine(engine: SyncEngine<B>) -> Self {
        let mode = engine.config().mode();
        SyncState {
            engine: Some(engine),
            mode,
            status: RwLock::new(SyncStatusDto {
                mode: mode.to_string(),
                configured: true,
                ..Default::default()
            }),
        }
    }

    pub fn disabled(mode: SyncMode) -> Self {
        SyncState {
            engine: None,
            mode,
            status: RwLock::new(SyncStatusDto {
                mode: mode.to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn engine(&self) -> Option<&SyncEngine<B>> {
        self.engine.as_ref()
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn status(&self) -> SyncStatusDto {
        let mut status = self
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        status.is_running = self.engine.as_ref().is_some_and(|e| e.is_running());
        status
    }

    /// Pushes every table.
    pub async fn sync_all(&self, snapshot: &Snapshot) -> ApiResult<SyncSummary> {
        let engine = self.require_engine()?;
        let reporter = |table: &str, progress: SyncProgress| self.record_progress(table, progress);
        let result = engine.sync_all(snapshot, &reporter).await;
        self.finish(result)
    }

    /// Re-runs the full sync; failed rows are not tracked individually.
    pub async fn retry_failed(&self, snapshot: &Snapshot) -> ApiResult<SyncSummary> {
        let engine = self.require_engine()?;
        let reporter = |table: &str, progress: SyncProgress| self.record_progress(table, progress);
        let result = engine.retry_failed(snapshot, &reporter).await;
        self.finish(result)
    }

    pub async fn import_frames(&self, frames: &[Frame]) -> ApiResult<TableReport> {
        let engine = self.require_engine()?;
        let reporter = |table: &str, progress: SyncProgress| self.record_progress(table, progress);
        let report = engine.import_frames(frames, &reporter).await?;
        self.update(|s| {
            s.current_table = None;
            s.progress = None;
        });
        Ok(report)
    }

    fn require_engine(&self) -> ApiResult<&SyncEngine<B>> {
        self.engine
            .as_ref()
            .ok_or_else(|| ApiError::from(SyncError::NotConfigured))
    }

    fn record_progress(&self, table: &str, progress: SyncProgress) {
        self.update(|s| {
            s.current_table = Some(table.to_string());
            s.progress = Some(progress);
        });
    }

    fn finish(&self, result: SyncResult<SyncSummary>) -> ApiResult<SyncSummary> {
        match result {
            Ok(summary) => {
                let error = summary
                    .has_failures()
                    .then(|| optipos_core::Translator::both("error.sync"));
                self.update(|s| {
                    s.current_table = None;
                    s.progress = None;
                    s.last_sync_at = Some(Utc::now().to_rfc3339());
                    s.last_summary = Some(summary.clone());
                    s.error = error;
                });
                Ok(summary)
            }
            // Another run owns the status; leave it alone.
            Err(SyncError::AlreadyRunning) => Err(SyncError::AlreadyRunning.into()),
            Err(e) => {
                let api: ApiError = e.into();
                self.update(|s| {
                    s.current_table = None;
                    s.progress = None;
                    s.error = Some(api.message.clone());
                });
                Err(api)
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut SyncStatusDto)) {
        f(&mut self.status.write().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optipos_sync::InMemoryBackend;

    fn test_config() -> SyncConfig {
        let mut config = SyncConfig::default();
        config.sync.initial_backoff_ms = 1;
        config.sync.max_retries = 1;
        config
    }

    #[tokio::test]
    async fn test_summary_recorded_in_status() {
        let sync = SyncState::with_engine(SyncEngine::new(InMemoryBackend::new(), test_config()));
        sync.sync_all(&Snapshot::default()).await.unwrap();

        let status = sync.status();
        assert!(status.configured);
        assert!(!status.is_running);
        assert!(status.last_sync_at.is_some());
        assert_eq!(status.last_summary.map(|s| s.tables.len()), Some(15));
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_disabled_sync_reports_not_configured() {
        let sync: SyncState<InMemoryBackend> = SyncState::disabled(SyncMode::Offline);
        let err = sync.sync_all(&Snapshot::default()).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SyncError);
        assert_eq!(sync.status().mode, "offline");
    }

    #[test]
    fn test_offline_config_builds_no_engine() {
        let mut config = SyncConfig::default();
        config.sync.mode = SyncMode::Offline;
        assert!(SyncState::from_config(config).engine().is_none());

        // Manual mode without a URL or key is also left disabled.
        assert!(SyncState::from_config(SyncConfig::default()).engine().is_none());
    }
}
