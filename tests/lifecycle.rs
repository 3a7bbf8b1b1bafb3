//! End-to-end ticket lifecycle: message in, ticket written, sweep follows up,
//! second sweep stays quiet.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use ticketwatch::classifier::provider::CompletionProvider;
use ticketwatch::classifier::ClassifierClient;
use ticketwatch::config::{ClassifierConfig, LedgerConfig};
use ticketwatch::error::{ClassifierError, GatewayError};
use ticketwatch::gateway::{MessageGateway, SendReceipt};
use ticketwatch::ledger::{InMemoryRowStore, RateBudget, TicketLedger};
use ticketwatch::orchestrator::{InboundMessage, MessageOutcome, TicketEngine};
use ticketwatch::scheduler::run_sweep;
use ticketwatch::ticket::Ticket;

struct FixedProvider {
    response: String,
}

#[async_trait]
impl CompletionProvider for FixedProvider {
    fn model_name(&self) -> &str {
        "fixed"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, ClassifierError> {
        Ok(self.response.clone())
    }
}

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send(
        &self,
        channel_ref: &str,
        text: &str,
        ticket_id: &str,
    ) -> Result<SendReceipt, GatewayError> {
        self.sent.lock().unwrap().push((
            channel_ref.to_string(),
            text.to_string(),
            ticket_id.to_string(),
        ));
        Ok(SendReceipt {
            message_id: Some("m1".into()),
        })
    }
}

#[tokio::test]
async fn ticket_lifecycle_end_to_end() {
    let store = Arc::new(InMemoryRowStore::new());
    let budget = Arc::new(RateBudget::new(&LedgerConfig::default()));
    let ledger = Arc::new(TicketLedger::new(store.clone(), budget));
    ledger.ensure_schema().await.unwrap();

    let classifier = ClassifierClient::new(
        Arc::new(FixedProvider {
            response: r#"{"isTicket": true, "customer": "Ada", "issue": "Payment page times out", "priority": "high", "category": "billing"}"#
                .to_string(),
        }),
        ClassifierConfig::default(),
    );
    let gateway = Arc::new(RecordingGateway::default());
    let engine = TicketEngine::new(
        classifier,
        ledger.clone(),
        gateway.clone() as Arc<dyn MessageGateway>,
    );

    // 1. Inbound message becomes a ticket.
    let outcome = engine
        .handle_message(&InboundMessage {
            channel_ref: "group-7".into(),
            sender_label: "Ada".into(),
            text: "the payment page keeps timing out for me".into(),
        })
        .await
        .unwrap();

    let ticket_id = match outcome {
        MessageOutcome::TicketCreated { ticket_id } => ticket_id,
        other => panic!("expected TicketCreated, got {other:?}"),
    };
    assert!(ticket_id.starts_with('T'));
    assert!(ticket_id[1..].chars().all(|c| c.is_ascii_digit()));

    // 2. Age the ticket three hours: never followed up, last_updated equals
    //    creation time.
    let mut rows = store.snapshot().await;
    assert_eq!(rows.len(), 2);
    let aged = Utc::now() - Duration::hours(3);
    rows[1][1] = aged.to_rfc3339();
    rows[1][7] = aged.to_rfc3339();
    store.seed(rows).await;

    // 3. Sweep with a 2-hour threshold sends exactly one follow-up.
    let gw: Arc<dyn MessageGateway> = gateway.clone();
    let report = run_sweep(&ledger, &gw, 2).await;
    assert_eq!(report.processed, 1);
    assert_eq!(report.follow_ups_sent, 1);
    assert!(report.errors.is_empty());

    let sent = gateway.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "group-7");
    assert!(sent[0].1.contains(&ticket_id));
    assert!(sent[0].1.contains("3 hours"));
    assert!(sent[0].1.contains("HIGH"));

    // 4. The ledger refresh reset the staleness clock: a sweep five minutes
    //    later (i.e. right away here) sends nothing.
    let ticket = ledger.get_ticket_by_id(&ticket_id).await.unwrap().unwrap();
    assert!(ticket.notes.contains("Follow-up sent at"));

    let second = run_sweep(&ledger, &gw, 2).await;
    assert_eq!(second.processed, 0);
    assert_eq!(second.follow_ups_sent, 0);
    assert_eq!(gateway.sent.lock().unwrap().len(), 1);

    // 5. The ticket row is still a valid ledger row.
    let rows = store.snapshot().await;
    let parsed = Ticket::from_row(&rows[1]).unwrap();
    assert_eq!(parsed.id, ticket_id);
    assert_eq!(parsed.customer, "Ada");
}
