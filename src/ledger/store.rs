//! Row store backends for the ticket ledger.
//!
//! `RowStore` is the narrow seam over the external append/read/update tabular
//! service. `HttpRowStore` is the production backend; `InMemoryRowStore`
//! backs tests and demos and can inject transport faults.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::LedgerError;

/// Range-based row store. Row indexes are physical and 0-based; index 0 is
/// the header row.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Full-range read of every row.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, LedgerError>;

    /// Append one row after the last existing row.
    async fn append_row(&self, row: Vec<String>) -> Result<(), LedgerError>;

    /// Overwrite the row at `index` in a single logical update.
    async fn update_row(&self, index: usize, row: Vec<String>) -> Result<(), LedgerError>;
}

// ── HTTP backend ────────────────────────────────────────────────────

/// HTTP client for the ledger service's row API.
pub struct HttpRowStore {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<Vec<String>>,
}

impl HttpRowStore {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn rows_url(&self) -> String {
        format!("{}/rows", self.base_url)
    }
}

#[async_trait]
impl RowStore for HttpRowStore {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, LedgerError> {
        let resp = self
            .client
            .get(self.rows_url())
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!("{status}: {detail}")));
        }

        let parsed: RowsResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(parsed.rows)
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), LedgerError> {
        let resp = self
            .client
            .post(self.rows_url())
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({ "row": row }))
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!("{status}: {detail}")));
        }
        Ok(())
    }

    async fn update_row(&self, index: usize, row: Vec<String>) -> Result<(), LedgerError> {
        let resp = self
            .client
            .put(format!("{}/{index}", self.rows_url()))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({ "row": row }))
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Transport(format!("{status}: {detail}")));
        }
        Ok(())
    }
}

// ── In-memory backend ───────────────────────────────────────────────

/// In-memory row store for tests and demos.
#[derive(Default)]
pub struct InMemoryRowStore {
    rows: Mutex<Vec<Vec<String>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load rows (header included).
    pub async fn seed(&self, rows: Vec<Vec<String>>) {
        *self.rows.lock().await = rows;
    }

    /// Copy of the current rows.
    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }

    /// Make subsequent reads fail with a transport error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent appends/updates fail with a transport error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("injected read failure".into()));
        }
        Ok(self.rows.lock().await.clone())
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("injected write failure".into()));
        }
        self.rows.lock().await.push(row);
        Ok(())
    }

    async fn update_row(&self, index: usize, row: Vec<String>) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("injected write failure".into()));
        }
        let mut rows = self.rows.lock().await;
        let slot = rows
            .get_mut(index)
            .ok_or_else(|| LedgerError::Transport(format!("row {index} out of range")))?;
        *slot = row;
        Ok(())
    }
}
