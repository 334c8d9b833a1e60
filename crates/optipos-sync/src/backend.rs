//! # Remote Backend
//!
//! The hosted relational store, seen as named tables of JSON rows.
//!
//! ```text
//! ┌──────────────┐   POST {url}/rest/v1/{table}               ┌─────────────┐
//! │  SyncEngine  │ ─────────────────────────────────────────► │   Hosted    │
//! │              │   apikey: <key>                            │   backend   │
//! │              │   Authorization: Bearer <key>              │             │
//! │              │   Prefer: resolution=merge-duplicates      │             │
//! │              │ ◄───────────────────────────────────────── │             │
//! └──────────────┘   2xx / 4xx / 5xx                          └─────────────┘
//! ```
//!
//! [`RestBackend`] talks to the real service; [`InMemoryBackend`] keeps rows
//! in memory and can be told to fail, for tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;
use crate::error::{SyncError, SyncResult};

/// Table-level access to the hosted backend.
pub trait RemoteBackend: Send + Sync {
    /// Inserts rows; the whole request fails if any row is rejected.
    fn insert(&self, table: &str, rows: &[Value]) -> impl Future<Output = SyncResult<()>> + Send;

    /// Inserts or merges rows on the `on_conflict` column.
    fn upsert(
        &self,
        table: &str,
        rows: &[Value],
        on_conflict: &str,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Reads the given comma-separated columns of every row.
    fn select(&self, table: &str, columns: &str)
        -> impl Future<Output = SyncResult<Vec<Value>>> + Send;
}

// =============================================================================
// REST Backend
// =============================================================================

#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base: Url,
    api_key: String,
}

impl RestBackend {
    /// Builds a client from config; fails with `NotConfigured` when the URL
    /// or key is missing.
    pub fn new(config: &BackendConfig) -> SyncResult<Self> {
        let (url, api_key) = match (&config.url, &config.api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => return Err(SyncError::NotConfigured),
        };

        let base = Url::parse(&format!("{}/rest/v1/", url.trim_end_matches('/')))?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client error: {}", e)))?;

        Ok(RestBackend {
            client,
            base,
            api_key: api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> SyncResult<Url> {
        Ok(self.base.join(table)?)
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn check(table: &str, response: Response) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Rejected {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

impl RemoteBackend for RestBackend {
    async fn insert(&self, table: &str, rows: &[Value]) -> SyncResult<()> {
        debug!(table, rows = rows.len(), "POST insert");
        let response = self
            .post(self.table_url(table)?)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Value], on_conflict: &str) -> SyncResult<()> {
        debug!(table, rows = rows.len(), on_conflict, "POST upsert");
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        let response = self
            .post(url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn select(&self, table: &str, columns: &str) -> SyncResult<Vec<Value>> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", columns);
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let rows = Self::check(table, response).await?.json::<Vec<Value>>().await?;
        debug!(table, rows = rows.len(), "GET select");
        Ok(rows)
    }
}

// =============================================================================
// In-Memory Backend
// =============================================================================

/// Rows kept in memory, with switches for injecting failures.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing_tables: Mutex<HashSet<String>>,
    failing_ids: Mutex<HashSet<String>>,
    transient_failures: AtomicU32,
    requests: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a table.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().extend(rows);
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .ok()
            .and_then(|t| t.get(table).cloned())
            .unwrap_or_default()
    }

    /// Every request touching `table` is rejected with 400.
    pub fn fail_table(&self, table: &str) {
        if let Ok(mut failing) = self.failing_tables.lock() {
            failing.insert(table.to_string());
        }
    }

    /// Any request containing a row with this `id` is rejected with 400.
    pub fn fail_row(&self, id: &str) {
        if let Ok(mut failing) = self.failing_ids.lock() {
            failing.insert(id.to_string());
        }
    }

    /// The next `count` requests fail with a connection error.
    pub fn fail_next(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing_tables.lock() {
            failing.clear();
        }
        if let Ok(mut failing) = self.failing_ids.lock() {
            failing.clear();
        }
        self.transient_failures.store(0, Ordering::SeqCst);
    }

    /// Number of requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn admit(&self, table: &str, rows: &[Value]) -> SyncResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if transient.is_ok() {
            return Err(SyncError::ConnectionFailed("connection reset".into()));
        }

        let rejected = |reason: &str| SyncError::Rejected {
            table: table.to_string(),
            status: 400,
            body: reason.to_string(),
        };

        if self
            .failing_tables
            .lock()
            .map(|f| f.contains(table))
            .unwrap_or(false)
        {
            return Err(rejected("table unavailable"));
        }

        let failing_ids = self
            .failing_ids
            .lock()
            .map_err(|_| SyncError::Internal("lock poisoned".into()))?;
        if rows
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .any(|id| failing_ids.contains(id))
        {
            return Err(rejected("row violates a constraint"));
        }
        Ok(())
    }

    fn write(&self, table: &str, rows: &[Value], on_conflict: Option<&str>) -> SyncResult<()> {
        self.admit(table, rows)?;
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| SyncError::Internal("lock poisoned".into()))?;
        let stored = tables.entry(table.to_string()).or_default();

        for row in rows {
            let existing = on_conflict.and_then(|columns| {
                stored.iter().position(|r| {
                    columns
                        .split(',')
                        .all(|c| r.get(c.trim()) == row.get(c.trim()))
                })
            });
            match existing {
                Some(index) => stored[index] = row.clone(),
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }
}

impl RemoteBackend for InMemoryBackend {
    async fn insert(&self, table: &str, rows: &[Value]) -> SyncResult<()> {
        self.write(table, rows, None)
    }

    async fn upsert(&self, table: &str, rows: &[Value], on_conflict: &str) -> SyncResult<()> {
        self.write(table, rows, Some(on_conflict))
    }

    async fn select(&self, table: &str, _columns: &str) -> SyncResult<Vec<Value>> {
        self.admit(table, &[])?;
        Ok(self.rows(table))
    }
}
