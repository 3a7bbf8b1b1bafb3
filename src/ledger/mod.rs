//! Ticket ledger — the single point of contact with the external tabular
//! store. Owns the 9-column row schema, ticket-id generation, and the shared
//! outbound request budget.

pub mod client;
pub mod rate_limit;
pub mod store;

pub use client::{TicketLedger, WriteReceipt};
pub use rate_limit::RateBudget;
pub use store::{HttpRowStore, InMemoryRowStore, RowStore};
