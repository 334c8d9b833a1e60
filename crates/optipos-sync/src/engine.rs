//! # Sync Engine
//!
//! Pushes every local collection to its backend table.
//!
//! ## Flow per table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  rows ──chunks(batch_size)──► upsert batch ──ok──► success += n         │
//! │                                   │                                     │
//! │                                   └─err──► one request per row          │
//! │                                              ├─ok──► success += 1       │
//! │                                              └─err─► failed += 1        │
//! │                                                      (logged, detail)   │
//! │                                                                         │
//! │  every request: transient errors retried with exponential backoff      │
//! │  after every batch / row: progress(processed, total, success, failed)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One failing row never stops the rest. Only one sync runs at a time; a
//! second caller gets [`SyncError::AlreadyRunning`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use optipos_core::catalog::Frame;
use optipos_core::reports;
use optipos_core::Snapshot;

use crate::backend::RemoteBackend;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::frames;
use crate::progress::{ProgressReporter, SyncProgress, SyncSummary, TableReport};
use crate::rows::{self, Row};

// =============================================================================
// Tables
// =============================================================================

/// Backend tables, in the order a full sync visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTable {
    Frames,
    LensTypes,
    LensCoatings,
    LensThicknesses,
    LensPricing,
    ContactLenses,
    Services,
    Patients,
    PatientNotes,
    GlassesPrescriptions,
    ContactLensPrescriptions,
    Invoices,
    Refunds,
    DailySummaries,
    MonthlySummaries,
}

impl SyncTable {
    pub const ALL: [SyncTable; 15] = [
        SyncTable::Frames,
        SyncTable::LensTypes,
        SyncTable::LensCoatings,
        SyncTable::LensThicknesses,
        SyncTable::LensPricing,
        SyncTable::ContactLenses,
        SyncTable::Services,
        SyncTable::Patients,
        SyncTable::PatientNotes,
        SyncTable::GlassesPrescriptions,
        SyncTable::ContactLensPrescriptions,
        SyncTable::Invoices,
        SyncTable::Refunds,
        SyncTable::DailySummaries,
        SyncTable::MonthlySummaries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SyncTable::Frames => "frames",
            SyncTable::LensTypes => "lens_types",
            SyncTable::LensCoatings => "lens_coatings",
            SyncTable::LensThicknesses => "lens_thicknesses",
            SyncTable::LensPricing => "lens_pricing_combinations",
            SyncTable::ContactLenses => "contact_lenses",
            SyncTable::Services => "services",
            SyncTable::Patients => "patients",
            SyncTable::PatientNotes => "patient_notes",
            SyncTable::GlassesPrescriptions => "glasses_prescriptions",
            SyncTable::ContactLensPrescriptions => "contact_lens_prescriptions",
            SyncTable::Invoices => "invoice_records",
            SyncTable::Refunds => "refund_records",
            SyncTable::DailySummaries => "daily_sales_summary",
            SyncTable::MonthlySummaries => "monthly_sales_summary",
        }
    }
}

impl std::fmt::Display for SyncTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Insert,
    Upsert(&'static str),
}

/// Holds the single-flight flag for the duration of a sync.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> SyncResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning)?;
        Ok(RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct SyncEngine<B> {
    backend: B,
    config: SyncConfig,
    running: AtomicBool,
}

impl<B: RemoteBackend> SyncEngine<B> {
    pub fn new(backend: B, config: SyncConfig) -> Self {
        SyncEngine {
            backend,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Syncs every table and aggregates the per-table results.
    pub async fn sync_all(
        &self,
        snapshot: &Snapshot,
        progress: &dyn ProgressReporter,
    ) -> SyncResult<SyncSummary> {
        self.ensure_enabled()?;
        let _guard = RunGuard::acquire(&self.running)?;
        info!(store = %self.config.store.id, "Sync started");

        let mut summary = SyncSummary::default();
        for table in SyncTable::ALL {
            summary
                .tables
                .push(self.run_table(table, snapshot, progress).await);
        }

        info!(
            success = summary.success(),
            failed = summary.failed(),
            duplicates = summary.duplicates(),
            "Sync finished"
        );
        Ok(summary)
    }

    /// Failed rows are not tracked individually, so a retry re-runs the
    /// whole sync. Upserts make that safe.
    pub async fn retry_failed(
        &self,
        snapshot: &Snapshot,
        progress: &dyn ProgressReporter,
    ) -> SyncResult<SyncSummary> {
        info!("Retrying failed items with a full sync");
        self.sync_all(snapshot, progress).await
    }

    pub async fn sync_table(
        &self,
        table: SyncTable,
        snapshot: &Snapshot,
        progress: &dyn ProgressReporter,
    ) -> SyncResult<TableReport> {
        self.ensure_enabled()?;
        let _guard = RunGuard::acquire(&self.running)?;
        Ok(self.run_table(table, snapshot, progress).await)
    }

    /// Bulk frame import: frames the backend already has (by brand, model,
    /// color and size) are counted as duplicates, the rest inserted.
    pub async fn import_frames(
        &self,
        frames: &[Frame],
        progress: &dyn ProgressReporter,
    ) -> SyncResult<TableReport> {
        self.ensure_enabled()?;
        let _guard = RunGuard::acquire(&self.running)?;
        Ok(self.push_frames(frames, false, progress).await)
    }

    fn ensure_enabled(&self) -> SyncResult<()> {
        if self.config.is_sync_enabled() {
            Ok(())
        } else {
            Err(SyncError::InvalidConfig("sync is disabled (offline mode)".into()))
        }
    }

    async fn run_table(
        &self,
        table: SyncTable,
        snapshot: &Snapshot,
        progress: &dyn ProgressReporter,
    ) -> TableReport {
        let store = self.config.store.id.as_str();
        let catalog = &snapshot.catalog;
        let rows = match table {
            SyncTable::Frames => return self.push_frames(&catalog.frames, true, progress).await,
            SyncTable::LensTypes => rows::lens_type_rows(catalog),
            SyncTable::LensCoatings => rows::lens_coating_rows(catalog),
            SyncTable::LensThicknesses => rows::lens_thickness_rows(catalog),
            SyncTable::LensPricing => rows::pricing_rows(catalog),
            SyncTable::ContactLenses => rows::contact_lens_rows(catalog),
            SyncTable::Services => rows::service_rows(catalog),
            SyncTable::Patients => rows::patient_rows(&snapshot.patients),
            SyncTable::PatientNotes => rows::patient_note_rows(&snapshot.patients),
            SyncTable::GlassesPrescriptions => rows::glasses_prescription_rows(&snapshot.patients),
            SyncTable::ContactLensPrescriptions => {
                rows::contact_lens_prescription_rows(&snapshot.patients)
            }
            SyncTable::Invoices => rows::invoice_rows(&snapshot.invoices, store),
            SyncTable::Refunds => rows::refund_rows(&snapshot.refunds, store),
            SyncTable::DailySummaries => rows::daily_summary_rows(
                &reports::daily_summaries(&snapshot.invoices, &snapshot.refunds),
                store,
            ),
            SyncTable::MonthlySummaries => rows::monthly_summary_rows(
                &reports::monthly_summaries(&snapshot.invoices, &snapshot.refunds),
                store,
            ),
        };

        self.push_rows(table.name(), &rows, WriteMode::Upsert("id"), progress)
            .await
    }

    /// Inserts frames the backend does not have yet. With `update_known`,
    /// frames whose id is already remote are upserted instead of being
    /// matched by key.
    async fn push_frames(
        &self,
        frames: &[Frame],
        update_known: bool,
        progress: &dyn ProgressReporter,
    ) -> TableReport {
        let table = SyncTable::Frames.name();
        let backend = &self.backend;

        let remote = match self
            .with_retry(table, move || backend.select(table, frames::KEY_COLUMNS))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(table, error = %e, "Could not read existing frames, nothing imported");
                let mut report = TableReport::new(table);
                report.failed = frames.len();
                report.details.push(format!("*: {}", e));
                progress.report(
                    table,
                    SyncProgress {
                        processed: frames.len(),
                        total: frames.len(),
                        success: 0,
                        failed: frames.len(),
                    },
                );
                return report;
            }
        };

        let known_ids = if update_known {
            frames::remote_ids(&remote)
        } else {
            HashSet::new()
        };
        let (existing, incoming): (Vec<&Frame>, Vec<&Frame>) =
            frames.iter().partition(|f| known_ids.contains(&f.id));

        let import = frames::partition(incoming, &frames::remote_keys(&remote));
        let new_rows: Vec<Row> = import.new.iter().map(|f| rows::frame_row(f)).collect();

        let mut report = self
            .push_rows(table, &new_rows, WriteMode::Insert, progress)
            .await;
        report.duplicates = import.duplicates;

        if !existing.is_empty() {
            let changed: Vec<Row> = existing.iter().map(|f| rows::frame_row(f)).collect();
            let updated = self
                .push_rows(table, &changed, WriteMode::Upsert("id"), progress)
                .await;
            report.absorb(updated);
        }

        info!(
            table,
            added = report.success,
            duplicates = report.duplicates,
            failed = report.failed,
            "Frames imported"
        );
        report
    }

    async fn push_rows(
        &self,
        table: &str,
        rows: &[Row],
        mode: WriteMode,
        progress: &dyn ProgressReporter,
    ) -> TableReport {
        let mut report = TableReport::new(table);
        let total = rows.len();
        let mut processed = 0;

        for chunk in rows.chunks(self.config.batch_size()) {
            let values: Vec<Value> = chunk.iter().map(|r| r.value.clone()).collect();

            match self.send(table, &values, mode).await {
                Ok(()) => {
                    report.success += chunk.len();
                    processed += chunk.len();
                    progress.report(table, snapshot_of(&report, processed, total));
                }
                Err(e) => {
                    warn!(
                        table,
                        rows = chunk.len(),
                        error = %e,
                        "Batch rejected, sending rows one by one"
                    );
                    for row in chunk {
                        match self.send(table, std::slice::from_ref(&row.value), mode).await {
                            Ok(()) => report.success += 1,
                            Err(e) => {
                                error!(table, id = %row.id, error = %e, "Row failed to sync");
                                report.failed += 1;
                                report.details.push(format!("{}: {}", row.id, e));
                            }
                        }
                        processed += 1;
                        progress.report(table, snapshot_of(&report, processed, total));
                    }
                }
            }
        }

        debug!(
            table,
            success = report.success,
            failed = report.failed,
            "Table synced"
        );
        report
    }

    async fn send(&self, table: &str, values: &[Value], mode: WriteMode) -> SyncResult<()> {
        let backend = &self.backend;
        match mode {
            WriteMode::Insert => {
                self.with_retry(table, move || backend.insert(table, values))
                    .await
            }
            WriteMode::Upsert(on_conflict) => {
                self.with_retry(table, move || backend.upsert(table, values, on_conflict))
                    .await
            }
        }
    }

    /// Runs `op`, retrying transient failures up to `max_retries` times.
    async fn with_retry<T, F, Fut>(&self, table: &str, mut op: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.sync.max_retries => {
                    attempt += 1;
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };
                    warn!(table, attempt, ?delay, error = %e, "Transient backend error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(std::time::Duration::from_millis(
                self.config.sync.initial_backoff_ms,
            ))
            .with_max_interval(std::time::Duration::from_secs(
                self.config.sync.max_backoff_secs,
            ))
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

fn snapshot_of(report: &TableReport, processed: usize, total: usize) -> SyncProgress {
    SyncProgress {
        processed,
        total,
        success: report.success,
        failed: report.failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::config::SyncMode;
    use crate::frames::tests::frame;
    use crate::progress::NoProgress;
    use chrono::Utc;
    use optipos_core::catalog::{CatalogItem, RepairService};
    use optipos_core::invoice::{InvoiceDraft, InvoiceItem};
    use optipos_core::{Command, Locale, LocalizedText, Money};
    use std::sync::Mutex;

    fn config(batch_size: usize) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.sync.batch_size = batch_size;
        config.sync.max_retries = 2;
        config.sync.initial_backoff_ms = 1;
        config.sync.max_backoff_secs = 1;
        config
    }

    fn service(i: usize) -> CatalogItem {
        CatalogItem::RepairService(RepairService {
            id: format!("s{}", i),
            name: LocalizedText::bilingual("Nose pad", "وسادة الأنف"),
            price: Money::from_major(2),
        })
    }

    fn snapshot_with_services(count: usize) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for i in 1..=count {
            snapshot = snapshot
                .apply(Command::UpsertCatalogItem(service(i)), Utc::now())
                .unwrap()
                .0;
        }
        snapshot
    }

    #[tokio::test]
    async fn test_sync_all_pushes_every_table() {
        let snapshot = snapshot_with_services(2)
            .apply(
                Command::CreateInvoice {
                    draft: InvoiceDraft {
                        patient_name: "Fatima".into(),
                        items: vec![InvoiceItem::Other {
                            description: LocalizedText::bilingual("Frame", "إطار"),
                            price: Money::from_major(45),
                        }],
                        deposit: Money::from_major(20),
                        ..Default::default()
                    },
                    with_work_order: false,
                },
                Utc::now(),
            )
            .unwrap()
            .0;

        let engine = SyncEngine::new(InMemoryBackend::new(), config(50));
        let summary = engine.sync_all(&snapshot, &NoProgress).await.unwrap();

        assert_eq!(summary.tables.len(), SyncTable::ALL.len());
        assert!(!summary.has_failures());
        assert_eq!(summary.table("services").unwrap().success, 2);
        assert_eq!(summary.table("invoice_records").unwrap().success, 1);
        assert_eq!(summary.table("daily_sales_summary").unwrap().success, 1);
        assert_eq!(engine.backend().rows("invoice_records")[0]["remaining"], "25.000");
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_failed_row_does_not_stop_the_batch() {
        let snapshot = snapshot_with_services(5);
        let backend = InMemoryBackend::new();
        backend.fail_row("s3");
        let engine = SyncEngine::new(backend, config(2));

        let updates = Mutex::new(Vec::new());
        let reporter = |_: &str, p: SyncProgress| updates.lock().unwrap().push(p);
        let report = engine
            .sync_table(SyncTable::Services, &snapshot, &reporter)
            .await
            .unwrap();

        assert_eq!(report.success, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.details.len(), 1);
        assert!(report.details[0].starts_with("s3:"));
        assert_eq!(engine.backend().rows("services").len(), 4);

        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!((last.processed, last.total), (5, 5));
        assert_eq!((last.success, last.failed), (4, 1));
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let snapshot = snapshot_with_services(3);
        let backend = InMemoryBackend::new();
        backend.fail_next(2);
        let engine = SyncEngine::new(backend, config(50));

        let report = engine
            .sync_table(SyncTable::Services, &snapshot, &NoProgress)
            .await
            .unwrap();
        assert_eq!(report.success, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(engine.backend().request_count(), 3);
    }

    #[tokio::test]
    async fn test_import_forty_frames_with_five_existing() {
        let backend = InMemoryBackend::new();
        backend.seed(
            "frames",
            (0..5).map(|i| rows::frame_row(&frame(i)).value).collect(),
        );
        let engine = SyncEngine::new(backend, config(50));

        let frames: Vec<Frame> = (0..40).map(frame).collect();
        let report = engine.import_frames(&frames, &NoProgress).await.unwrap();

        assert_eq!(report.success, 35);
        assert_eq!(report.duplicates, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(engine.backend().rows("frames").len(), 40);
    }

    #[tokio::test]
    async fn test_frame_edit_reaches_backend_on_next_sync() {
        let mut snapshot = Snapshot::default();
        for i in 0..2 {
            snapshot = snapshot
                .apply(Command::UpsertCatalogItem(CatalogItem::Frame(frame(i))), Utc::now())
                .unwrap()
                .0;
        }
        let engine = SyncEngine::new(InMemoryBackend::new(), config(50));
        engine
            .sync_table(SyncTable::Frames, &snapshot, &NoProgress)
            .await
            .unwrap();

        let mut edited = frame(1);
        edited.price = Money::from_major(60);
        edited.stock = 7;
        let snapshot = snapshot
            .apply(Command::UpsertCatalogItem(CatalogItem::Frame(edited)), Utc::now())
            .unwrap()
            .0;
        let report = engine
            .sync_table(SyncTable::Frames, &snapshot, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.success, 2);
        assert_eq!(report.duplicates, 0);
        let rows = engine.backend().rows("frames");
        assert_eq!(rows.len(), 2);
        let stored = rows.iter().find(|r| r["id"] == "f1").unwrap();
        assert_eq!(stored["price"], "60.000");
        assert_eq!(stored["stock"], 7);
    }

    #[tokio::test]
    async fn test_reimporting_arabic_only_color_counts_duplicate() {
        let engine = SyncEngine::new(InMemoryBackend::new(), config(50));
        let mut f = frame(0);
        f.color = LocalizedText::new("brown").with(Locale::Ar, "بني");

        let first = engine
            .import_frames(std::slice::from_ref(&f), &NoProgress)
            .await
            .unwrap();
        assert_eq!((first.success, first.duplicates), (1, 0));

        for _ in 0..2 {
            let again = engine
                .import_frames(std::slice::from_ref(&f), &NoProgress)
                .await
                .unwrap();
            assert_eq!((again.success, again.duplicates), (0, 1));
        }
        assert_eq!(engine.backend().rows("frames").len(), 1);
    }

    #[tokio::test]
    async fn test_frames_fail_when_existing_rows_unreadable() {
        let backend = InMemoryBackend::new();
        backend.fail_table("frames");
        let engine = SyncEngine::new(backend, config(50));

        let frames: Vec<Frame> = (0..3).map(frame).collect();
        let report = engine.import_frames(&frames, &NoProgress).await.unwrap();
        assert_eq!(report.success, 0);
        assert_eq!(report.failed, 3);
    }

    #[tokio::test]
    async fn test_second_sync_is_rejected_while_first_runs() {
        let snapshot = snapshot_with_services(1);
        let backend = InMemoryBackend::new();
        // The first sync sleeps in backoff, so the second one finds it running.
        backend.fail_next(1);
        let engine = SyncEngine::new(backend, config(50));

        let (first, second) = tokio::join!(
            engine.sync_all(&snapshot, &NoProgress),
            engine.sync_all(&snapshot, &NoProgress)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(SyncError::AlreadyRunning)));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_retry_failed_reruns_everything() {
        let snapshot = snapshot_with_services(3);
        let backend = InMemoryBackend::new();
        backend.fail_table("services");
        let engine = SyncEngine::new(backend, config(50));

        let first = engine.sync_all(&snapshot, &NoProgress).await.unwrap();
        assert_eq!(first.table("services").unwrap().failed, 3);

        engine.backend().heal();
        let retry = engine.retry_failed(&snapshot, &NoProgress).await.unwrap();
        assert!(!retry.has_failures());
        assert_eq!(engine.backend().rows("services").len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_does_not_duplicate_rows() {
        let snapshot = snapshot_with_services(2);
        let engine = SyncEngine::new(InMemoryBackend::new(), config(50));

        engine.sync_all(&snapshot, &NoProgress).await.unwrap();
        engine.sync_all(&snapshot, &NoProgress).await.unwrap();
        assert_eq!(engine.backend().rows("services").len(), 2);
    }

    #[tokio::test]
    async fn test_offline_mode_refuses_to_sync() {
        let mut config = config(50);
        config.sync.mode = SyncMode::Offline;
        let engine = SyncEngine::new(InMemoryBackend::new(), config);

        let err = engine
            .sync_all(&Snapshot::default(), &NoProgress)
            .await
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(SyncTable::Invoices.to_string(), "invoice_records");
        assert_eq!(SyncTable::LensPricing.name(), "lens_pricing_combinations");
    }
}
