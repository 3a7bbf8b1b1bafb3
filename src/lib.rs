//! Ticketwatch — ticket lifecycle engine for chat-group support.
//!
//! Watches chat-group messages, classifies them as support tickets, persists
//! them in an external tabular ledger, and periodically re-notifies groups
//! about tickets that have gone stale.

pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod orchestrator;
pub mod scheduler;
pub mod ticket;
