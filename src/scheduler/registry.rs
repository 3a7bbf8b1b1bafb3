//! Scheduler instance registry.
//!
//! An explicit, constructor-injected registry — not a module-level singleton —
//! so tests can run isolated registries side by side. Each started instance
//! is an independent ticker task: immediate first sweep, then one sweep per
//! interval. Ticks never overlap (the sweep is awaited inside the loop) and
//! stopping cancels future ticks without interrupting an in-flight sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::classifier::compose_follow_up;
use crate::config::SchedulerConfig;
use crate::error::{ConfigError, Error, SchedulerError};
use crate::gateway::MessageGateway;
use crate::ledger::TicketLedger;
use crate::scheduler::sweep::run_sweep;

/// Tracked scheduler instance.
struct Instance {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Registry of follow-up scheduler instances sharing one ledger client
/// (and therefore one rate budget) and one messaging gateway.
pub struct FollowUpScheduler {
    ledger: Arc<TicketLedger>,
    gateway: Arc<dyn MessageGateway>,
    instances: RwLock<HashMap<Uuid, Instance>>,
}

impl FollowUpScheduler {
    /// Dependencies are taken by value here, so "scheduler started without a
    /// ledger" is unrepresentable. Config values are still checked in `start`.
    pub fn new(ledger: Arc<TicketLedger>, gateway: Arc<dyn MessageGateway>) -> Self {
        Self {
            ledger,
            gateway,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new instance. Sweeps immediately, then every
    /// `interval_minutes`. Returns the instance id.
    pub async fn start(&self, config: SchedulerConfig) -> Result<Uuid, Error> {
        if config.interval_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "interval_minutes".into(),
                message: "must be at least 1".into(),
            }
            .into());
        }
        if config.stale_threshold_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "stale_threshold_hours".into(),
                message: "must be positive".into(),
            }
            .into());
        }

        let id = Uuid::new_v4();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let ledger = self.ledger.clone();
        let gateway = self.gateway.clone();

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(config.interval_minutes * 60));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                // The sweep itself is not cancellable: a stop request takes
                // effect at the next tick boundary.
                let report = run_sweep(&ledger, &gateway, config.stale_threshold_hours).await;
                tracing::info!(
                    instance = %id,
                    processed = report.processed,
                    sent = report.follow_ups_sent,
                    errors = report.errors.len(),
                    "Scheduled sweep finished"
                );
            }
            tracing::info!(instance = %id, "Scheduler instance stopped");
        });

        self.instances
            .write()
            .await
            .insert(id, Instance { stop_tx, handle });

        tracing::info!(
            instance = %id,
            interval_minutes = config.interval_minutes,
            stale_threshold_hours = config.stale_threshold_hours,
            "Scheduler instance started"
        );
        Ok(id)
    }

    /// Stop one instance. Cancels future ticks; an in-flight sweep runs to
    /// completion on its own task.
    pub async fn stop(&self, id: Uuid) -> Result<(), Error> {
        let instance = self
            .instances
            .write()
            .await
            .remove(&id)
            .ok_or(SchedulerError::InstanceNotFound(id))?;
        let _ = instance.stop_tx.send(true);
        drop(instance.handle);
        Ok(())
    }

    /// Stop every instance.
    pub async fn stop_all(&self) {
        let mut instances = self.instances.write().await;
        for (id, instance) in instances.drain() {
            let _ = instance.stop_tx.send(true);
            drop(instance.handle);
            tracing::debug!(instance = %id, "Stop requested");
        }
    }

    /// Number of active instances (health check).
    pub async fn active_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Operator-triggered out-of-band follow-up for one OPEN ticket.
    /// No staleness filter and no dedup check.
    pub async fn trigger_follow_up(&self, ticket_id: &str) -> Result<(), Error> {
        let ticket = self
            .ledger
            .get_open_tickets()
            .await
            .into_iter()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| SchedulerError::TicketNotOpen(ticket_id.to_string()))?;

        let now = Utc::now();
        let hours_stale = ticket
            .last_updated
            .map(|ts| now.signed_duration_since(ts).num_hours())
            .unwrap_or(0)
            .max(0);
        let text = compose_follow_up(&ticket, hours_stale);

        self.gateway
            .send(&ticket.channel_ref, &text, &ticket.id)
            .await?;

        let note = format!("Follow-up sent at {}", Utc::now().to_rfc3339());
        self.ledger
            .update_ticket_status(&ticket.id, ticket.status, Some(&note))
            .await?;

        tracing::info!(ticket_id = %ticket_id, "Manual follow-up sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use crate::config::LedgerConfig;
    use crate::error::GatewayError;
    use crate::gateway::SendReceipt;
    use crate::ledger::{InMemoryRowStore, RateBudget, RowStore};
    use crate::ticket::{Category, Priority, Status, Ticket};

    struct RecordingGateway {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageGateway for RecordingGateway {
        async fn send(
            &self,
            _channel_ref: &str,
            _text: &str,
            ticket_id: &str,
        ) -> Result<SendReceipt, GatewayError> {
            self.sent.lock().unwrap().push(ticket_id.to_string());
            Ok(SendReceipt { message_id: None })
        }
    }

    async fn setup(
        tickets: &[Ticket],
    ) -> (Arc<RecordingGateway>, FollowUpScheduler) {
        let store = Arc::new(InMemoryRowStore::new());
        let budget = Arc::new(RateBudget::new(&LedgerConfig::default()));
        let ledger = TicketLedger::new(store.clone(), budget);
        ledger.ensure_schema().await.unwrap();
        for t in tickets {
            store.append_row(t.to_row()).await.unwrap();
        }
        let gateway = RecordingGateway::new();
        let scheduler = FollowUpScheduler::new(
            Arc::new(ledger),
            gateway.clone() as Arc<dyn MessageGateway>,
        );
        (gateway, scheduler)
    }

    fn open_ticket(id: &str, updated_minutes_ago: i64) -> Ticket {
        let ts = Utc::now() - ChronoDuration::minutes(updated_minutes_ago);
        Ticket {
            id: id.into(),
            created_at: Some(ts),
            last_updated: Some(ts),
            channel_ref: "group-1".into(),
            customer: "Ada".into(),
            issue: "Checkout 500s".into(),
            priority: Priority::Medium,
            category: Category::Technical,
            status: Status::Open,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn zero_interval_is_a_config_error() {
        let (_, scheduler) = setup(&[]).await;
        let result = scheduler
            .start(SchedulerConfig {
                interval_minutes: 0,
                stale_threshold_hours: 2,
            })
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(scheduler.active_count().await, 0);
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let (_, scheduler) = setup(&[]).await;

        let a = scheduler.start(SchedulerConfig::default()).await.unwrap();
        let b = scheduler.start(SchedulerConfig::default()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(scheduler.active_count().await, 2);

        scheduler.stop(a).await.unwrap();
        assert_eq!(scheduler.active_count().await, 1);

        // Stopping twice is an error: the instance is gone.
        assert!(matches!(
            scheduler.stop(a).await,
            Err(Error::Scheduler(SchedulerError::InstanceNotFound(_)))
        ));

        scheduler.stop_all().await;
        assert_eq!(scheduler.active_count().await, 0);
    }

    #[tokio::test]
    async fn immediate_sweep_on_start() {
        let (gateway, scheduler) = setup(&[open_ticket("T1", 180)]).await;

        let id = scheduler.start(SchedulerConfig::default()).await.unwrap();
        // Give the spawned ticker a moment for its immediate first tick.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        scheduler.stop(id).await.unwrap();

        assert_eq!(gateway.sent.lock().unwrap().as_slice(), ["T1"]);
    }

    #[tokio::test]
    async fn manual_trigger_skips_dedup() {
        // Updated 5 minutes ago: a sweep would skip it, the manual path must not.
        let (gateway, scheduler) = setup(&[open_ticket("T7", 5)]).await;

        scheduler.trigger_follow_up("T7").await.unwrap();
        assert_eq!(gateway.sent.lock().unwrap().as_slice(), ["T7"]);
    }

    #[tokio::test]
    async fn manual_trigger_unknown_ticket() {
        let (_, scheduler) = setup(&[]).await;
        let result = scheduler.trigger_follow_up("T404").await;
        assert!(matches!(
            result,
            Err(Error::Scheduler(SchedulerError::TicketNotOpen(_)))
        ));
    }

    #[tokio::test]
    async fn manual_trigger_refreshes_ticket() {
        let (_, scheduler) = setup(&[open_ticket("T7", 300)]).await;
        scheduler.trigger_follow_up("T7").await.unwrap();

        let refreshed = scheduler
            .ledger
            .get_ticket_by_id("T7")
            .await
            .unwrap()
            .unwrap();
        assert!(refreshed.notes.contains("Follow-up sent at"));
        assert_eq!(refreshed.status, Status::Open);
    }
}
