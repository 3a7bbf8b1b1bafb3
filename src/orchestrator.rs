//! Thin orchestration layer: inbound message → classifier → ledger, plus the
//! scheduler control surface. No business logic of its own beyond routing.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::{ClassifierClient, TicketVerdict, UpdateVerdict};
use crate::config::SchedulerConfig;
use crate::error::Error;
use crate::gateway::MessageGateway;
use crate::ledger::TicketLedger;
use crate::scheduler::FollowUpScheduler;
use crate::ticket::TicketDraft;

static TICKET_ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bT\d+\b").expect("static regex"));

/// One chat-group message, as delivered by the webhook plumbing.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Opaque identifier of the originating group/conversation.
    pub channel_ref: String,
    /// Display label of the sender.
    pub sender_label: String,
    /// Message body. May be empty (media-only messages).
    pub text: String,
}

/// What the engine did with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Not a ticket and not an update (or classification failed closed).
    Ignored,
    TicketCreated { ticket_id: String },
    StatusUpdated { ticket_id: String },
}

/// Health snapshot for the control surface.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub active_instances: usize,
}

/// Wires classifier, ledger, and scheduler together.
pub struct TicketEngine {
    classifier: ClassifierClient,
    ledger: Arc<TicketLedger>,
    scheduler: FollowUpScheduler,
}

impl TicketEngine {
    pub fn new(
        classifier: ClassifierClient,
        ledger: Arc<TicketLedger>,
        gateway: Arc<dyn MessageGateway>,
    ) -> Self {
        let scheduler = FollowUpScheduler::new(ledger.clone(), gateway);
        Self {
            classifier,
            ledger,
            scheduler,
        }
    }

    /// Route one inbound message.
    ///
    /// Messages naming a `T<digits>` token are tried as status updates first;
    /// everything else (and updates the classifier rejects) goes down the
    /// new-ticket path.
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<MessageOutcome, Error> {
        if message.text.trim().is_empty() {
            return Ok(MessageOutcome::Ignored);
        }

        if let Some(token) = TICKET_ID_TOKEN.find(&message.text) {
            let verdict = self
                .classifier
                .classify_status_update(&message.text, Some(token.as_str()))
                .await;

            if let UpdateVerdict::Update {
                ticket_id: Some(ticket_id),
                new_status,
                notes,
            } = verdict
            {
                self.ledger
                    .update_ticket_status(&ticket_id, new_status, notes.as_deref())
                    .await?;
                info!(ticket_id = %ticket_id, status = new_status.label(), "Status update applied");
                return Ok(MessageOutcome::StatusUpdated { ticket_id });
            }
            debug!("Message names a ticket id but is not an update, trying ticket path");
        }

        match self
            .classifier
            .classify_ticket(&message.text, &message.sender_label, Some(&message.channel_ref))
            .await
        {
            TicketVerdict::Ticket(fields) => {
                let receipt = self
                    .ledger
                    .write_ticket(TicketDraft {
                        channel_ref: message.channel_ref.clone(),
                        customer: fields.customer,
                        issue: fields.issue,
                        priority: fields.priority,
                        category: fields.category,
                    })
                    .await?;
                info!(ticket_id = %receipt.ticket_id, "Ticket created from message");
                Ok(MessageOutcome::TicketCreated {
                    ticket_id: receipt.ticket_id,
                })
            }
            TicketVerdict::NotTicket => Ok(MessageOutcome::Ignored),
        }
    }

    // ── Scheduler control surface ───────────────────────────────────

    pub async fn start_scheduler(&self, config: SchedulerConfig) -> Result<Uuid, Error> {
        self.scheduler.start(config).await
    }

    pub async fn stop_scheduler(&self, id: Uuid) -> Result<(), Error> {
        self.scheduler.stop(id).await
    }

    pub async fn stop_all(&self) {
        self.scheduler.stop_all().await;
    }

    pub async fn trigger_follow_up(&self, ticket_id: &str) -> Result<(), Error> {
        self.scheduler.trigger_follow_up(ticket_id).await
    }

    pub async fn health(&self) -> Health {
        Health {
            active_instances: self.scheduler.active_count().await,
        }
    }
}
