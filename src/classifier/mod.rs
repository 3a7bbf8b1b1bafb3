//! Classifier client — labels chat-group messages as tickets or status
//! updates via an external NLP service, and composes follow-up text.
//!
//! Contract highlights:
//! - Empty input short-circuits without a network call.
//! - Any transport, timeout, or schema failure fails **closed**
//!   (not-a-ticket / not-an-update). Classification never raises to callers
//!   and never creates a ticket from ambiguous input.
//! - Unknown enum labels in the response coerce to documented defaults
//!   instead of rejecting.

pub mod client;
pub mod followup;
pub mod provider;

pub use client::{ClassifierClient, TicketVerdict, UpdateVerdict};
pub use followup::compose_follow_up;
pub use provider::{CompletionProvider, HttpCompletionProvider};
