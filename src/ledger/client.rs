//! Ticket ledger client — CRUD-ish operations over the row store.
//!
//! Guarantees:
//! - `ensure_schema` runs before any write (`NotInitialized` otherwise) and
//!   is idempotent: it writes the header into an empty store and refuses to
//!   touch a store whose header does not match the 9-column schema.
//! - Every outbound store call first takes a slot from the shared
//!   `RateBudget`, which may suspend the caller.
//! - Read paths degrade to empty results on transport failure so a sweep can
//!   proceed with zero stale tickets instead of crashing.
//! - `last_updated` is monotonically non-decreasing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::rate_limit::RateBudget;
use crate::ledger::store::RowStore;
use crate::ticket::{LEDGER_HEADER, Status, Ticket, TicketDraft};

/// Result of a successful `write_ticket`.
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    pub ticket_id: String,
    pub created_at: DateTime<Utc>,
}

/// The single point of contact with the external tabular ledger.
pub struct TicketLedger {
    store: Arc<dyn RowStore>,
    budget: Arc<RateBudget>,
    initialized: AtomicBool,
}

impl TicketLedger {
    pub fn new(store: Arc<dyn RowStore>, budget: Arc<RateBudget>) -> Self {
        Self {
            store,
            budget,
            initialized: AtomicBool::new(false),
        }
    }

    /// Idempotent schema check: write the header row into an empty store,
    /// verify it elsewhere. Must succeed before any ticket write.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        self.budget.acquire().await;
        let rows = self.store.read_all().await?;

        match rows.first() {
            None => {
                self.budget.acquire().await;
                self.store
                    .append_row(LEDGER_HEADER.iter().map(|s| s.to_string()).collect())
                    .await?;
                info!("Ledger header row written");
            }
            Some(header) => {
                let matches = header.len() >= LEDGER_HEADER.len()
                    && header
                        .iter()
                        .zip(LEDGER_HEADER.iter())
                        .all(|(got, want)| got.trim() == *want);
                if !matches {
                    return Err(LedgerError::SchemaMismatch(format!(
                        "found {header:?}"
                    )));
                }
                debug!("Ledger header row verified");
            }
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn check_initialized(&self) -> Result<(), LedgerError> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::NotInitialized)
        }
    }

    /// Append a new open ticket. Generates the ticket id: epoch millis plus a
    /// random 4-digit suffix, so the id keeps the `T<digits>` shape while
    /// same-millisecond writes stay distinct.
    pub async fn write_ticket(&self, draft: TicketDraft) -> Result<WriteReceipt, LedgerError> {
        self.check_initialized()?;

        let now = Utc::now();
        let ticket_id = format!(
            "T{}{:04}",
            now.timestamp_millis(),
            rand::thread_rng().gen_range(0..10_000)
        );

        let ticket = Ticket {
            id: ticket_id.clone(),
            created_at: Some(now),
            last_updated: Some(now),
            channel_ref: draft.channel_ref,
            customer: draft.customer,
            issue: draft.issue,
            priority: draft.priority,
            category: draft.category,
            status: Status::Open,
            notes: String::new(),
        };

        self.budget.acquire().await;
        self.store.append_row(ticket.to_row()).await?;

        info!(ticket_id = %ticket_id, customer = %ticket.customer, "Ticket written to ledger");
        Ok(WriteReceipt {
            ticket_id,
            created_at: now,
        })
    }

    /// All currently open tickets. Transport failure degrades to an empty
    /// list (logged) — a sweep continues with zero tickets instead of dying.
    pub async fn get_open_tickets(&self) -> Vec<Ticket> {
        self.read_tickets()
            .await
            .into_iter()
            .filter(|t| t.status == Status::Open)
            .collect()
    }

    /// Open tickets whose `last_updated` predates `now - hours_old`.
    /// Malformed timestamps read as not stale.
    pub async fn get_stale_tickets(&self, hours_old: i64) -> Vec<Ticket> {
        let cutoff = Utc::now() - Duration::hours(hours_old);
        self.read_tickets()
            .await
            .into_iter()
            .filter(|t| {
                t.status == Status::Open
                    && t.last_updated.map(|ts| ts < cutoff).unwrap_or(false)
            })
            .collect()
    }

    /// Point lookup by ticket id.
    pub async fn get_ticket_by_id(
        &self,
        ticket_id: &str,
    ) -> Result<Option<Ticket>, LedgerError> {
        self.budget.acquire().await;
        let rows = self.store.read_all().await?;
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(|row| Ticket::from_row(row))
            .find(|t| t.id == ticket_id))
    }

    /// Update status (+ `last_updated`, + appended notes) for one ticket in a
    /// single logical row update. Fails with `NotFound` for unknown ids and
    /// `InvalidTransition` when the status graph forbids the move.
    pub async fn update_ticket_status(
        &self,
        ticket_id: &str,
        new_status: Status,
        notes: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.check_initialized()?;

        self.budget.acquire().await;
        let rows = self.store.read_all().await?;

        // Column scan for the id; index 0 is the header.
        let (row_index, mut ticket) = rows
            .iter()
            .enumerate()
            .skip(1)
            .find_map(|(i, row)| {
                Ticket::from_row(row)
                    .filter(|t| t.id == ticket_id)
                    .map(|t| (i, t))
            })
            .ok_or_else(|| LedgerError::NotFound {
                ticket_id: ticket_id.to_string(),
            })?;

        if !ticket.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                ticket_id: ticket_id.to_string(),
                from: ticket.status.label().to_string(),
                to: new_status.label().to_string(),
            });
        }

        let now = Utc::now();
        // Monotonic: never move last_updated backwards, even under clock skew.
        let last_updated = match ticket.last_updated {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        ticket.status = new_status;
        ticket.last_updated = Some(last_updated);
        if let Some(extra) = notes.filter(|n| !n.trim().is_empty()) {
            if ticket.notes.is_empty() {
                ticket.notes = extra.to_string();
            } else {
                ticket.notes = format!("{}\n{}", ticket.notes, extra);
            }
        }

        self.budget.acquire().await;
        self.store.update_row(row_index, ticket.to_row()).await?;

        info!(
            ticket_id = %ticket_id,
            status = new_status.label(),
            "Ticket status updated"
        );
        Ok(())
    }

    async fn read_tickets(&self) -> Vec<Ticket> {
        self.budget.acquire().await;
        match self.store.read_all().await {
            Ok(rows) => rows
                .iter()
                .skip(1)
                .filter_map(|row| Ticket::from_row(row))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Ledger read failed, degrading to empty result");
                Vec::new()
            }
        }
    }
}
