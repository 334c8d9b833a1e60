//! # Sync Commands
//!
//! Manual push of every table, retry, frame import and status polling.
//! The background loop in auto mode calls the same [`SyncState`] methods.

use tracing::{debug, info};

use optipos_core::catalog::Frame;
use optipos_sync::{RemoteBackend, SyncSummary, TableReport};

use crate::error::ApiResult;
use crate::state::{StoreState, SyncState, SyncStatusDto};

/// Pushes the current snapshot. A second call while one runs fails with
/// `SYNC_IN_PROGRESS`.
pub async fn sync_now<B: RemoteBackend>(
    store: &StoreState,
    sync: &SyncState<B>,
) -> ApiResult<SyncSummary> {
    debug!("sync_now command");
    let snapshot = store.snapshot();
    let summary = sync.sync_all(&snapshot).await?;
    info!(
        succeeded = summary.success(),
        failed = summary.failed(),
        "Manual sync finished"
    );
    Ok(summary)
}

pub async fn retry_failed_sync<B: RemoteBackend>(
    store: &StoreState,
    sync: &SyncState<B>,
) -> ApiResult<SyncSummary> {
    debug!("retry_failed_sync command");
    let snapshot = store.snapshot();
    sync.retry_failed(&snapshot).await
}

/// Bulk frame upload; frames already in the cloud are counted as
/// duplicates.
pub async fn import_frames<B: RemoteBackend>(
    sync: &SyncState<B>,
    frames: Vec<Frame>,
) -> ApiResult<TableReport> {
    debug!(count = frames.len(), "import_frames command");
    sync.import_frames(&frames).await
}

pub fn get_sync_status<B: RemoteBackend>(sync: &SyncState<B>) -> SyncStatusDto {
    sync.status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::invoice::create_invoice;
    use crate::commands::tests::{frame_sale, store};
    use crate::error::ErrorCode;
    use crate::state::SessionState;
    use optipos_sync::{InMemoryBackend, SyncConfig, SyncEngine, SyncMode};

    fn sync_state() -> SyncState<InMemoryBackend> {
        let mut config = SyncConfig::default();
        config.sync.initial_backoff_ms = 1;
        config.sync.max_retries = 1;
        SyncState::with_engine(SyncEngine::new(InMemoryBackend::new(), config))
    }

    #[tokio::test]
    async fn test_sync_pushes_created_invoice() {
        let store = store().await;
        let sync = sync_state();
        create_invoice(&store, &SessionState::default(), frame_sale(45, 20), false)
            .await
            .unwrap();

        let summary = sync_now(&store, &sync).await.unwrap();
        assert_eq!(summary.failed(), 0);
        assert!(summary.success() >= 2);

        let backend = sync.engine().unwrap().backend();
        assert_eq!(backend.rows("invoice_records").len(), 1);
        assert!(get_sync_status(&sync).last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_sync_without_backend_is_error() {
        let store = store().await;
        let sync: SyncState<InMemoryBackend> = SyncState::disabled(SyncMode::Manual);
        let err = sync_now(&store, &sync).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SyncError);
    }
}
