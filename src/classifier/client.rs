//! Ticket / status-update classification over the completion provider.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classifier::provider::CompletionProvider;
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::ticket::{Category, Priority, Status};

/// Outcome of `classify_ticket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketVerdict {
    /// Not a support ticket (or classification failed — same thing here).
    NotTicket,
    /// A support ticket with coerced fields.
    Ticket(TicketFields),
}

/// Classifier-extracted ticket fields. The originating channel is attached
/// later by the caller; the classifier only sees text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFields {
    pub customer: String,
    pub issue: String,
    pub priority: Priority,
    pub category: Category,
}

/// Outcome of `classify_status_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateVerdict {
    NotUpdate,
    Update {
        /// Ticket the update refers to, if the message (or caller) named one.
        ticket_id: Option<String>,
        new_status: Status,
        notes: Option<String>,
    },
}

/// Client for the external NLP classification service.
///
/// Purely functional from the caller's perspective: no side effects beyond
/// the outbound call, and no error ever propagates out of `classify_*`.
pub struct ClassifierClient {
    provider: Arc<dyn CompletionProvider>,
    config: ClassifierConfig,
}

impl ClassifierClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ClassifierConfig) -> Self {
        Self { provider, config }
    }

    /// Classify a chat message as ticket / not-ticket.
    ///
    /// Empty or blank `text` short-circuits to `NotTicket` without calling
    /// the provider. All failures fail closed.
    pub async fn classify_ticket(
        &self,
        text: &str,
        sender_label: &str,
        channel_label: Option<&str>,
    ) -> TicketVerdict {
        if text.trim().is_empty() {
            return TicketVerdict::NotTicket;
        }

        let user_prompt = build_ticket_user_prompt(text, sender_label, channel_label);
        let raw = match self
            .provider
            .complete(TICKET_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Ticket classification failed, treating as not-a-ticket");
                return TicketVerdict::NotTicket;
            }
        };

        match parse_ticket_response(&raw, sender_label, text, self.config.issue_max_chars) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, raw = %raw, "Unparseable ticket response, treating as not-a-ticket");
                TicketVerdict::NotTicket
            }
        }
    }

    /// Classify a chat message as a status update for an existing ticket.
    ///
    /// Same short-circuit and fail-closed rules as `classify_ticket`.
    pub async fn classify_status_update(
        &self,
        text: &str,
        known_ticket_id: Option<&str>,
    ) -> UpdateVerdict {
        if text.trim().is_empty() {
            return UpdateVerdict::NotUpdate;
        }

        let user_prompt = build_update_user_prompt(text, known_ticket_id);
        let raw = match self
            .provider
            .complete(UPDATE_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Status-update classification failed, treating as not-an-update");
                return UpdateVerdict::NotUpdate;
            }
        };

        match parse_update_response(&raw, known_ticket_id) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, raw = %raw, "Unparseable update response, treating as not-an-update");
                UpdateVerdict::NotUpdate
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

const TICKET_SYSTEM_PROMPT: &str = "You are a support-ticket triage engine for chat groups. \
Decide whether a message reports a problem that needs support attention.\n\n\
Respond with ONLY a JSON object:\n\
{\"isTicket\": true|false, \"customer\": \"...\", \"issue\": \"...\", \"priority\": \"low|medium|high\", \"category\": \"technical|billing|general|other\"}\n\n\
Rules:\n\
- Greetings, chit-chat, acknowledgements: isTicket=false\n\
- \"issue\" is a one-sentence summary of the problem\n\
- \"customer\" is the person reporting it (default to the sender)\n\
- When unsure of priority or category, use medium / other";

const UPDATE_SYSTEM_PROMPT: &str = "You are a support-ticket triage engine. \
Decide whether a message reports progress on an EXISTING ticket \
(e.g. \"working on it\", \"fixed\", \"escalating to the vendor\").\n\n\
Respond with ONLY a JSON object:\n\
{\"isUpdate\": true|false, \"ticketId\": \"...\", \"newStatus\": \"open|in_progress|resolved|escalated\", \"updateNotes\": \"...\"}\n\n\
Rules:\n\
- New problem reports are NOT updates: isUpdate=false\n\
- Omit \"ticketId\" if the message does not name one\n\
- \"updateNotes\" is a short summary of the reported progress";

fn build_ticket_user_prompt(text: &str, sender_label: &str, channel_label: Option<&str>) -> String {
    let mut prompt = String::with_capacity(256);
    prompt.push_str(&format!("From: {sender_label}\n"));
    if let Some(channel) = channel_label {
        prompt.push_str(&format!("Group: {channel}\n"));
    }
    let preview: String = text.chars().take(1000).collect();
    prompt.push_str(&format!("\nMessage:\n{preview}"));
    prompt
}

fn build_update_user_prompt(text: &str, known_ticket_id: Option<&str>) -> String {
    let mut prompt = String::with_capacity(256);
    if let Some(id) = known_ticket_id {
        prompt.push_str(&format!("Known ticket id: {id}\n"));
    }
    let preview: String = text.chars().take(1000).collect();
    prompt.push_str(&format!("\nMessage:\n{preview}"));
    prompt
}

// ── Response parsing ────────────────────────────────────────────────

/// Raw classifier response for the ticket contract. The boolean discriminator
/// is `Option` on purpose: a response without it is a schema failure, not a
/// quiet `false`.
#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(rename = "isTicket")]
    is_ticket: Option<bool>,
    #[serde(default)]
    customer: String,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "isUpdate")]
    is_update: Option<bool>,
    #[serde(rename = "ticketId", default)]
    ticket_id: String,
    #[serde(rename = "newStatus", default)]
    new_status: String,
    #[serde(rename = "updateNotes", default)]
    update_notes: String,
}

fn parse_ticket_response(
    raw: &str,
    sender_label: &str,
    original_text: &str,
    issue_max_chars: usize,
) -> Result<TicketVerdict, ClassifierError> {
    let json_str = extract_json_object(raw);
    let response: TicketResponse = serde_json::from_str(&json_str)?;

    let is_ticket = response.is_ticket.ok_or_else(|| {
        ClassifierError::InvalidResponse("missing isTicket discriminator".into())
    })?;
    if !is_ticket {
        return Ok(TicketVerdict::NotTicket);
    }

    let customer = if response.customer.trim().is_empty() {
        sender_label.to_string()
    } else {
        response.customer.trim().to_string()
    };
    let issue_source = if response.issue.trim().is_empty() {
        original_text
    } else {
        response.issue.trim()
    };
    let issue: String = issue_source.chars().take(issue_max_chars).collect();

    debug!(customer = %customer, "Classified message as ticket");
    Ok(TicketVerdict::Ticket(TicketFields {
        customer,
        issue,
        priority: Priority::from_label(&response.priority),
        category: Category::from_label(&response.category),
    }))
}

fn parse_update_response(
    raw: &str,
    known_ticket_id: Option<&str>,
) -> Result<UpdateVerdict, ClassifierError> {
    let json_str = extract_json_object(raw);
    let response: UpdateResponse = serde_json::from_str(&json_str)?;

    let is_update = response.is_update.ok_or_else(|| {
        ClassifierError::InvalidResponse("missing isUpdate discriminator".into())
    })?;
    if !is_update {
        return Ok(UpdateVerdict::NotUpdate);
    }

    let ticket_id = if response.ticket_id.trim().is_empty() {
        known_ticket_id.map(str::to_string)
    } else {
        Some(response.ticket_id.trim().to_string())
    };
    let notes = if response.update_notes.trim().is_empty() {
        None
    } else {
        Some(response.update_notes.trim().to_string())
    };

    Ok(UpdateVerdict::Update {
        ticket_id,
        new_status: Status::from_label(&response.new_status),
        notes,
    })
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
