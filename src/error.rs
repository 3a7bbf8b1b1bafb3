//! Error types for ticketwatch.

use std::time::Duration;

/// Top-level error type for the ticket lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Configuration-related errors. These are fatal at startup or `start()`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Classifier client errors.
///
/// These never escape `classify_*` — the client fails closed — but they are
/// distinct variants so the fail-closed log line says what actually happened.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classification request failed: {0}")]
    RequestFailed(String),

    #[error("Classification timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid classification response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ticket ledger errors. Transport failures and logical failures are
/// separate variants so callers can tell a flaky store from a missing ticket.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger transport failed: {0}")]
    Transport(String),

    #[error("Ledger header row does not match the ticket schema: {0}")]
    SchemaMismatch(String),

    #[error("Ticket not found: {ticket_id}")]
    NotFound { ticket_id: String },

    #[error("Invalid status transition for {ticket_id}: {from} -> {to}")]
    InvalidTransition {
        ticket_id: String,
        from: String,
        to: String,
    },

    #[error("Ledger not initialized — ensure_schema() must run before writes")]
    NotInitialized,
}

/// Messaging gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Send to {channel_ref} failed: {reason}")]
    SendFailed { channel_ref: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Scheduler errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler instance {0} not found")]
    InstanceNotFound(uuid::Uuid),

    #[error("No open ticket with id {0}")]
    TicketNotOpen(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
