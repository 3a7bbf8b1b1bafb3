use std::sync::Arc;

use ticketwatch::classifier::{ClassifierClient, HttpCompletionProvider};
use ticketwatch::config::{ClassifierConfig, LedgerConfig, SchedulerConfig};
use ticketwatch::gateway::HttpMessageGateway;
use ticketwatch::ledger::{HttpRowStore, RateBudget, TicketLedger};
use ticketwatch::orchestrator::TicketEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Required endpoints and keys
    let classifier_url = require_env("TICKETWATCH_CLASSIFIER_URL")?;
    let classifier_key = require_env("TICKETWATCH_CLASSIFIER_KEY")?;
    let ledger_url = require_env("TICKETWATCH_LEDGER_URL")?;
    let ledger_token = require_env("TICKETWATCH_LEDGER_TOKEN")?;
    let gateway_url = require_env("TICKETWATCH_GATEWAY_URL")?;
    let gateway_token = require_env("TICKETWATCH_GATEWAY_TOKEN")?;

    let model = std::env::var("TICKETWATCH_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    let scheduler_config = SchedulerConfig {
        interval_minutes: env_or("TICKETWATCH_INTERVAL_MIN", 30),
        stale_threshold_hours: env_or("TICKETWATCH_STALE_HOURS", 2),
    };

    eprintln!("🎫 Ticketwatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);
    eprintln!("   Ledger: {}", ledger_url);
    eprintln!(
        "   Sweep: every {} min, stale after {} h\n",
        scheduler_config.interval_minutes, scheduler_config.stale_threshold_hours
    );

    // ── Classifier ──────────────────────────────────────────────────
    let classifier_config = ClassifierConfig::default();
    let provider = HttpCompletionProvider::new(
        classifier_url,
        secrecy::SecretString::from(classifier_key),
        model,
        &classifier_config,
    )?;
    let classifier = ClassifierClient::new(Arc::new(provider), classifier_config);

    // ── Ledger ──────────────────────────────────────────────────────
    let store = Arc::new(HttpRowStore::new(
        ledger_url,
        secrecy::SecretString::from(ledger_token),
    ));
    let budget = Arc::new(RateBudget::new(&LedgerConfig::default()));
    let ledger = Arc::new(TicketLedger::new(store, budget));
    ledger.ensure_schema().await?;

    // ── Gateway & engine ────────────────────────────────────────────
    let gateway = Arc::new(HttpMessageGateway::new(
        gateway_url,
        secrecy::SecretString::from(gateway_token),
    ));
    let engine = Arc::new(TicketEngine::new(classifier, ledger, gateway));

    let instance = engine.start_scheduler(scheduler_config).await?;
    tracing::info!(instance = %instance, "Follow-up scheduler running");

    tokio::signal::ctrl_c().await?;
    eprintln!("\nShutting down...");
    engine.stop_all().await;

    Ok(())
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{key} not set"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
