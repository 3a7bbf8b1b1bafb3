//! One sweep: fetch stale tickets, dedup, compose, send, refresh.
//!
//! Tickets are processed strictly sequentially in ledger order — no fan-out,
//! so one sweep cannot blow through the shared ledger rate budget. A failure
//! on one ticket is recorded and the sweep moves on.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::classifier::compose_follow_up;
use crate::gateway::MessageGateway;
use crate::ledger::TicketLedger;
use crate::ticket::Ticket;

/// Fixed dedup guard: a ticket updated within this window was presumably
/// already followed up, whatever the staleness threshold says.
pub const DEDUP_WINDOW_MINUTES: i64 = 60;

/// Sweep summary, for observability. No caller's control flow depends on it.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Stale tickets examined.
    pub processed: usize,
    /// Follow-ups actually delivered.
    pub follow_ups_sent: usize,
    /// One entry per failed ticket; failures never abort the sweep.
    pub errors: Vec<String>,
    /// The stale tickets this sweep saw.
    pub stale_tickets: Vec<Ticket>,
}

/// Run one sweep over tickets stale for more than `stale_threshold_hours`.
pub async fn run_sweep(
    ledger: &Arc<TicketLedger>,
    gateway: &Arc<dyn MessageGateway>,
    stale_threshold_hours: i64,
) -> SweepReport {
    let stale = ledger.get_stale_tickets(stale_threshold_hours).await;
    let now = Utc::now();
    let mut report = SweepReport {
        stale_tickets: stale.clone(),
        ..Default::default()
    };

    for ticket in &stale {
        report.processed += 1;

        // Dedup: an update inside the last hour means a follow-up (or a real
        // status change) already reset the clock.
        if let Some(last_updated) = ticket.last_updated
            && now.signed_duration_since(last_updated) < Duration::minutes(DEDUP_WINDOW_MINUTES)
        {
            debug!(ticket_id = %ticket.id, "Skipping follow-up, updated within dedup window");
            continue;
        }

        let hours_stale = ticket
            .last_updated
            .map(|ts| now.signed_duration_since(ts).num_hours())
            .unwrap_or(stale_threshold_hours);
        let text = compose_follow_up(ticket, hours_stale);

        match gateway.send(&ticket.channel_ref, &text, &ticket.id).await {
            Ok(_) => {
                report.follow_ups_sent += 1;
                // Same-status update: records the follow-up and resets the
                // dedup clock via last_updated.
                let note = format!("Follow-up sent at {}", Utc::now().to_rfc3339());
                if let Err(e) = ledger
                    .update_ticket_status(&ticket.id, ticket.status, Some(&note))
                    .await
                {
                    warn!(ticket_id = %ticket.id, error = %e, "Follow-up sent but ledger refresh failed");
                    report.errors.push(format!("{}: {e}", ticket.id));
                }
            }
            Err(e) => {
                warn!(ticket_id = %ticket.id, error = %e, "Follow-up send failed, continuing sweep");
                report.errors.push(format!("{}: {e}", ticket.id));
            }
        }
    }

    info!(
        processed = report.processed,
        sent = report.follow_ups_sent,
        errors = report.errors.len(),
        "Sweep complete"
    );
    report
}
