//! # OptiPOS Application Library
//!
//! Wires storage, session and sync together and runs the application.
//!
//! ## Module Organization
//! ```text
//! optipos_app/
//! ├── lib.rs          ◄─── You are here (startup, background sync, shutdown)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── store.rs    ◄─── Snapshot + database, single writer
//! │   ├── session.rs  ◄─── Language, navigation, selected location
//! │   ├── sync.rs     ◄─── Sync engine and polled status
//! │   └── config.rs   ◄─── Store name and receipt width
//! ├── commands/       ◄─── One module per screen family
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Multiple State Types)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐    │
//! │  │  StoreState  │ │ SessionState │ │  SyncState   │ │ ConfigState  │    │
//! │  │ • snapshot   │ │ • translator │ │ • engine     │ │ • store name │    │
//! │  │ • database   │ │ • navigator  │ │ • status     │ │ • receipt    │    │
//! │  │              │ │ • location   │ │              │ │   width      │    │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └──────────────┘    │
//! │                                                                         │
//! │  Each command requests only the state it needs.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use optipos_db::{Database, DbConfig};
use optipos_sync::{RemoteBackend, RestBackend, SyncConfig};

use state::{ConfigState, SessionState, StoreState, SyncState};

/// Fully initialized application state.
pub struct App<B = RestBackend> {
    pub store: Arc<StoreState>,
    pub session: Arc<SessionState>,
    pub config: Arc<ConfigState>,
    pub sync: Arc<SyncState<B>>,
    sync_interval: Duration,
}

impl App<RestBackend> {
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. Load sync config ─────── optipos.toml + OPTIPOS_SYNC_* overrides    │
    /// │  2. Open database ────────── OPTIPOS_DB_PATH or the app data dir        │
    /// │                              (WAL mode, migrations applied)             │
    /// │  3. Load snapshot ────────── every table into one immutable value       │
    /// │  4. Restore session ──────── stored language and location selection    │
    /// │  5. Build sync state ─────── disabled when offline or unconfigured      │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn start() -> anyhow::Result<Self> {
        let sync_config = SyncConfig::load_or_default(None);
        let interval = sync_config.interval();

        let db = Database::new(DbConfig::from_env())
            .await
            .context("failed to open database")?;
        info!("Database connected and migrations applied");

        let session = SessionState::restore(&db)
            .await
            .context("failed to restore session")?;
        let store = StoreState::load(db)
            .await
            .context("failed to load data")?;

        Ok(App {
            store: Arc::new(store),
            session: Arc::new(session),
            config: Arc::new(ConfigState::from_env()),
            sync: Arc::new(SyncState::from_config(sync_config)),
            sync_interval: interval,
        })
    }
}

impl<B: RemoteBackend + 'static> App<B> {
    pub fn new(
        store: StoreState,
        session: SessionState,
        config: ConfigState,
        sync: SyncState<B>,
        sync_interval: Duration,
    ) -> Self {
        App {
            store: Arc::new(store),
            session: Arc::new(session),
            config: Arc::new(config),
            sync: Arc::new(sync),
            sync_interval,
        }
    }

    /// Starts the background push when sync runs in auto mode.
    pub fn spawn_background_sync(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.sync.mode().runs_in_background() || self.sync.engine().is_none() {
            debug!(mode = %self.sync.mode(), "Background sync not started");
            return None;
        }
        info!(interval_secs = self.sync_interval.as_secs(), "Background sync started");
        Some(tokio::spawn(sync_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.sync),
            self.sync_interval,
            shutdown,
        )))
    }
}

/// Pushes the latest snapshot every `interval` until shutdown. A tick that
/// lands while a manual sync runs is skipped.
async fn sync_loop<B: RemoteBackend>(
    store: Arc<StoreState>,
    sync: Arc<SyncState<B>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if sync.engine().is_some_and(|e| e.is_running()) {
                    debug!("Sync already running, skipping tick");
                    continue;
                }
                let snapshot = store.snapshot();
                match sync.sync_all(&snapshot).await {
                    Ok(summary) if summary.has_failures() => {
                        warn!(failed = summary.failed(), "Background sync finished with failures")
                    }
                    Ok(summary) => debug!(rows = summary.success(), "Background sync finished"),
                    Err(e) => warn!(error = %e, "Background sync failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Background sync stopped");
                    break;
                }
            }
        }
    }
}

/// Runs the application until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting OptiPOS");

    let app = App::start().await?;
    info!(
        patients = app.store.snapshot().patients.len(),
        invoices = app.store.snapshot().invoices.len(),
        locale = %app.session.locale(),
        sync_mode = %app.sync.mode(),
        "State initialized"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = app.spawn_background_sync(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");

    // Receivers may already be gone when no loop was started.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = background {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background sync task ended abnormally");
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=optipos=trace` - Show trace for optipos crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,optipos=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
